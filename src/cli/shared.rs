use clap::Args;
use simple_error::{SimpleResult, bail};

#[derive(Args)]
pub struct SharedSettings {
    /// Number of threads to use for alignment and confirmation. Defaults to all logical cpus detected.
    #[arg(long = "threads", visible_alias = "cores", value_name = "THREAD_COUNT")]
    thread_count_option: Option<usize>,

    /// This value will be filled in by thread_count_option
    #[arg(skip)]
    pub thread_count: usize,

    /// Turn on extra debug logging
    ///
    /// This option enables extra logging intended for debugging only. It is highly
    /// recommended (but not required) to set --threads to 1 when this is enabled.
    ///
    #[arg(long)]
    pub debug: bool,

    /// Print the evidence counts and fused score of every confirmed cluster to stderr
    #[arg(long)]
    pub debug_confirm: bool,
}

pub fn validate_and_fix_shared_settings(
    mut settings: SharedSettings,
) -> SimpleResult<SharedSettings> {
    settings.thread_count = match settings.thread_count_option {
        Some(count) => {
            if count == 0 {
                bail!("--threads argument must be greater than 0");
            }
            count
        }
        None => num_cpus::get(),
    };

    Ok(settings)
}
