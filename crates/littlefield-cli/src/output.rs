use crate::commands::CommandOutput;
use crate::error::CliError;

pub fn render(output: &CommandOutput, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(output)?
    } else {
        serde_json::to_string(output)?
    };
    println!("{payload}");
    Ok(())
}
