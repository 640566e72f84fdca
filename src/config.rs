//! Configuração do bugflow carregada a partir de `bugflow.toml`.
//!
//! A struct [`BugflowConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `BUGFLOW_SNAPSHOT` tem precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuração de nível superior carregada de `bugflow.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct BugflowConfig {
    /// Salva um snapshot após cada operação bem-sucedida.
    #[serde(default)]
    pub persist: bool,

    /// Caminho do arquivo JSON de snapshot.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

// Valor padrão para o snapshot: "bugflow.json" no diretório atual.
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("bugflow.json")
}

impl Default for BugflowConfig {
    fn default() -> Self {
        Self {
            persist: false,
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl BugflowConfig {
    /// Carrega a configuração de `bugflow.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_path(Path::new("bugflow.toml"))?;

        // Variável de ambiente tem precedência e liga a persistência.
        if let Ok(path) = std::env::var("BUGFLOW_SNAPSHOT")
            && !path.is_empty()
        {
            config.snapshot_path = PathBuf::from(path);
            config.persist = true;
        }

        Ok(config)
    }

    /// Lê um arquivo TOML específico; ausência do arquivo resulta nos defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str::<BugflowConfig>(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }
}
