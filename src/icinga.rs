//! Icinga2 `CheckCommand` definitions generated from the command line of a check.

use clap::ArgAction;

/// Environment variable that makes [print_if_env_and_exit] print the definition.
pub const GENERATE_ENV: &str = "GENERATE_ICINGA_COMMAND";

pub struct CheckCommand {
    name: String,
    arguments: Vec<CommandArgument>,
}

struct CommandArgument {
    flag: String,
    var: String,
    description: Option<String>,
    is_flag: bool,
    default: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IcingaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid executable path")]
    InvalidExecutablePath,
    #[error("argument {0} has no long name")]
    MissingLongArgument(String),
}

impl CheckCommand {
    /// Describes every long argument of `cmd`. Custom variables are named
    /// `<name>_<argument>`.
    pub fn from_command(name: &str, cmd: &clap::Command) -> Result<Self, IcingaError> {
        let prefix = name.replace('-', "_");
        let mut arguments = Vec::new();

        for arg in cmd.get_arguments() {
            if matches!(arg.get_action(), ArgAction::Help | ArgAction::Version) {
                continue;
            }
            let long = arg
                .get_long()
                .ok_or_else(|| IcingaError::MissingLongArgument(arg.get_id().to_string()))?;

            // Flags are off unless set_if says otherwise, they need no default.
            let is_flag = matches!(arg.get_action(), ArgAction::SetTrue | ArgAction::SetFalse);
            let default = if is_flag {
                None
            } else {
                arg.get_default_values()
                    .first()
                    .and_then(|v| v.to_str())
                    .map(|s| s.to_owned())
            };

            arguments.push(CommandArgument {
                flag: format!("--{long}"),
                var: format!("{prefix}_{}", long.replace('-', "_")),
                description: arg.get_help().map(|s| s.to_string()),
                is_flag,
                default,
            });
        }

        Ok(CheckCommand {
            name: name.to_owned(),
            arguments,
        })
    }

    /// Renders the definition with `executable` as the command to run.
    pub fn render(&self, executable: &str) -> String {
        let mut out = format!("object CheckCommand \"{}\" {{\n", self.name);
        out.push_str(&format!("  command = [ \"{}\" ]\n", escape(executable)));
        out.push_str("  arguments = {\n");

        for arg in &self.arguments {
            out.push_str(&format!("    \"{}\" = {{\n", arg.flag));
            let key = if arg.is_flag { "set_if" } else { "value" };
            out.push_str(&format!("      {} = \"${}$\"\n", key, arg.var));
            if let Some(ref description) = arg.description {
                out.push_str(&format!("      description = \"{}\"\n", escape(description)));
            }
            out.push_str("    }\n");
        }
        out.push_str("  }\n");

        let defaults: Vec<_> = self
            .arguments
            .iter()
            .filter_map(|arg| arg.default.as_ref().map(|d| (&arg.var, d)))
            .collect();
        if !defaults.is_empty() {
            out.push('\n');
            for (var, default) in defaults {
                out.push_str(&format!("  vars.{} = \"{}\"\n", var, escape(default)));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Renders the definition pointing at the running executable.
    pub fn render_for_current_exe(&self) -> Result<String, IcingaError> {
        let exe = std::env::current_exe()?;
        let exe = exe.to_str().ok_or(IcingaError::InvalidExecutablePath)?;
        Ok(self.render(exe))
    }
}

fn escape(s: &str) -> String {
    s.replace('"', "\\\"").replace('$', "\\$")
}

/// Prints the Icinga definition and exits if [GENERATE_ENV] is set, returns otherwise.
pub fn print_if_env_and_exit(name: &str, cmd: &clap::Command) -> Result<(), IcingaError> {
    if std::env::var_os(GENERATE_ENV).is_none() {
        return Ok(());
    }

    let out = CheckCommand::from_command(name, cmd)?.render_for_current_exe()?;
    println!("{}", out.trim_end());
    std::process::exit(0);
}

#[cfg(test)]
mod tests {
    use clap::{Arg, Command};

    use super::*;

    fn command() -> Command {
        Command::new("check_tsd")
            .arg(
                Arg::new("metric")
                    .long("metric")
                    .short('m')
                    .help("Metric to query."),
            )
            .arg(
                Arg::new("duration")
                    .long("duration")
                    .default_value("600")
                    .help("How far back to look for \"data\" in $SECONDS."),
            )
            .arg(Arg::new("no-result-ok").long("no-result-ok").action(ArgAction::SetTrue))
    }

    #[test]
    fn test_render() {
        let cmd = CheckCommand::from_command("tsd", &command()).unwrap();
        let expected = "object CheckCommand \"tsd\" {
  command = [ \"/usr/lib/nagios/plugins/check_tsd\" ]
  arguments = {
    \"--metric\" = {
      value = \"$tsd_metric$\"
      description = \"Metric to query.\"
    }
    \"--duration\" = {
      value = \"$tsd_duration$\"
      description = \"How far back to look for \\\"data\\\" in \\$SECONDS.\"
    }
    \"--no-result-ok\" = {
      set_if = \"$tsd_no_result_ok$\"
    }
  }

  vars.tsd_duration = \"600\"
}
";
        assert_eq!(cmd.render("/usr/lib/nagios/plugins/check_tsd"), expected);
    }

    #[test]
    fn test_missing_long() {
        let cmd = Command::new("x").arg(Arg::new("positional"));
        assert!(matches!(
            CheckCommand::from_command("x", &cmd),
            Err(IcingaError::MissingLongArgument(_))
        ));
    }
}
