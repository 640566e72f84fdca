//! Interface de linha de comando do bugflow baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (demo, list)
//! e flags globais (--store, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// bugflow — ciclo de vida de relatórios de defeito controlado por papéis.
#[derive(Debug, Parser)]
#[command(name = "bugflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo de snapshot; liga a persistência e sobrepõe `bugflow.toml`.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa o ciclo completo de um relatório com contas de exemplo.
    Demo {
        /// Descrição do relatório submetido pelo usuário de exemplo.
        #[arg(default_value = "Application crashes when saving an empty file")]
        description: String,
    },

    /// Lista os relatórios do snapshot salvo.
    List,
}
