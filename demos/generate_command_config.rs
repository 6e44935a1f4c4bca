use clap::CommandFactory;

use tsdcheck::icinga::CheckCommand;

#[derive(clap::Parser)]
struct Cli {
    /// Metric to query.
    #[clap(long)]
    metric: String,
    /// How far back to look for data, in seconds.
    #[clap(long, default_value = "600")]
    duration: String,
    /// Return OK when the query returns no result.
    #[clap(long)]
    no_result_ok: bool,
    #[clap(long)]
    tag: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The env var GENERATE_ICINGA_COMMAND prints the definition for the running executable
    tsdcheck::icinga::print_if_env_and_exit("example", &Cli::command())?;

    let definition = CheckCommand::from_command("example", &Cli::command())?;
    println!("{}", definition.render("/usr/lib/nagios/plugins/check_example"));

    Ok(())
}
