//! Output formatting utilities for the CLI

use std::collections::BTreeMap;

use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use st_core::ValidationErrors;

/// Format validation errors as a FIELD / MESSAGE table
pub fn format_errors(errors: &ValidationErrors) -> String {
    #[derive(Tabled)]
    struct ErrorRow {
        #[tabled(rename = "FIELD")]
        field: String,
        #[tabled(rename = "MESSAGE")]
        message: String,
    }

    let rows: Vec<ErrorRow> = errors
        .iter()
        .flat_map(|(field, messages)| {
            messages.iter().map(move |message| ErrorRow {
                field: field.to_string(),
                message: message.clone(),
            })
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(100))
        .to_string()
}

/// Format published parameters as a NAME / VALUE table
///
/// Returns "No tunnel parameters" if there are none.
pub fn format_parameters(parameters: &BTreeMap<String, String>) -> String {
    if parameters.is_empty() {
        return "No tunnel parameters".to_string();
    }

    #[derive(Tabled)]
    struct ParameterRow {
        #[tabled(rename = "PARAMETER")]
        name: String,
        #[tabled(rename = "VALUE")]
        value: String,
    }

    let rows: Vec<ParameterRow> = parameters
        .iter()
        .map(|(name, value)| ParameterRow {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix, to stderr
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow, to stderr
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_errors_lists_every_message() {
        let mut errors = ValidationErrors::new();
        errors.push("host", "Host must be specified");
        errors.push("remotePort", "Remote port must be specified");
        errors.push("remotePort", "second");

        let table = format_errors(&errors);
        assert!(table.contains("FIELD"));
        assert!(table.contains("Host must be specified"));
        assert!(table.contains("Remote port must be specified"));
        assert_eq!(table.matches("remotePort").count(), 2);
    }

    #[test]
    fn test_format_parameters() {
        assert_eq!(format_parameters(&BTreeMap::new()), "No tunnel parameters");

        let parameters = BTreeMap::from([(
            "sshTunnel.db.local.port".to_string(),
            "41234".to_string(),
        )]);
        let table = format_parameters(&parameters);
        assert!(table.contains("PARAMETER"));
        assert!(table.contains("sshTunnel.db.local.port"));
        assert!(table.contains("41234"));
    }
}
