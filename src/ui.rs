//! Saída de terminal do bugflow — tabela de relatórios e passos coloridos.
//!
//! Usa a crate `console` para estilização com cores. O [`Printer`]
//! formata o resultado de cada operação do fluxo e a lista de relatórios.

use console::Style;

use crate::state_machine::{Report, State};

/// Estilos usados para imprimir operações e relatórios no terminal.
pub struct Printer {
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl Default for Printer {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }
}

impl Printer {
    /// Exibe o resultado de um passo: verde com checkmark ou vermelho com X.
    pub fn step<T, E: std::fmt::Display>(&self, label: &str, result: &Result<T, E>) {
        match result {
            Ok(_) => println!("  {} {label}", self.green.apply_to("✓")),
            Err(e) => println!("  {} {label}: {e}", self.red.apply_to("✗")),
        }
    }

    /// Imprime todos os relatórios, um por linha, com o estado colorido.
    pub fn reports(&self, reports: &[Report]) {
        if reports.is_empty() {
            println!("{}", self.dim.apply_to("No reports."));
            return;
        }
        println!("{}", self.dim.apply_to("─── Reports ───"));
        for report in reports {
            let state = match report.state() {
                State::Verified => self.green.apply_to(report.state()),
                State::Resolved => self.yellow.apply_to(report.state()),
                _ => self.dim.apply_to(report.state()),
            };
            println!("{:>5}  {state}  {}", report.id().to_string(), describe(report));
        }
    }
}

// Descrição seguida da resolução e nota, quando houver.
fn describe(report: &Report) -> String {
    match report.resolution_note() {
        Some(note) => format!(
            "{} [{}: {note}]",
            report.description(),
            report.resolution()
        ),
        None => report.description().to_string(),
    }
}
