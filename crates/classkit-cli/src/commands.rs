//! CLI command definitions.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Show trial and premium status
    Status,

    /// Activate an unlock code on this device
    Activate {
        /// Unlock code
        code: String,
    },

    /// Release this device's license
    Deactivate,

    /// Show the license stored on this device
    License,

    /// Re-validate the stored license
    Verify,

    /// Show device identity and license summary
    DeviceInfo,

    /// Ask the feature gate whether an action is allowed
    Check {
        /// Action name, e.g. add_student or export_data
        action: String,

        /// Items of that kind that already exist
        #[arg(short, long, default_value_t = 0)]
        count: u32,
    },

    /// Manage unlock codes
    Codes {
        #[command(subcommand)]
        command: CodeCommands,
    },

    /// Manage the trial
    Trial {
        #[command(subcommand)]
        command: TrialCommands,
    },

    /// Run the license service
    Serve {
        /// Settings file (TOML, YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum CodeCommands {
    /// Issue a new code in the registry
    Generate {
        /// Code prefix
        #[arg(short, long, default_value = "TEACH")]
        prefix: String,

        /// Devices the code may activate
        #[arg(short, long, default_value_t = 1)]
        max_devices: u32,
    },

    /// Print a customer code without registering it
    Customer {
        /// Customer phone, name or school
        info: String,
    },

    /// Print a pattern code, e.g. SCHOOL_<hash>_<time>_<random>
    Pattern {
        /// Leading pattern
        pattern: String,

        /// Customer phone, name or school
        info: String,
    },

    /// Print customer codes for every entry of a JSON or YAML list
    Bulk {
        /// File with `[{info, phone, maxDevices}]` entries
        file: PathBuf,
    },

    /// Check that a code has the generated-code format
    Validate {
        /// Code to check
        code: String,
    },

    /// Show usage of every code
    Stats,

    /// Delete a code and all its activations
    Revoke {
        /// Code to revoke
        code: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Free the slot a device holds on a code
    ResetDevice {
        /// Code
        code: String,

        /// Device ID to release
        device_id: String,
    },
}

#[derive(Subcommand)]
pub enum TrialCommands {
    /// Restart the trial and clear premium state
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set configuration value
    Set {
        /// Key
        key: String,

        /// Value
        value: String,
    },
}
