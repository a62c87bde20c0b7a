//! Typesetting and output of a resolved page.
//!
//! The roff source is typeset by `groff` into a temporary file, which is then
//! shown in a pager when stdout is a terminal and copied to stdout otherwise.

use std::io::{self, IsTerminal};
use std::process::{ExitStatus, Stdio};

use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

use crate::config::RenderConfig;

/// man(1)'s default pager.
const DEFAULT_PAGER: [&str; 2] = ["less", "-is"];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("typeset: {0}")]
    Typeset(#[source] io::Error),

    #[error("typeset: groff exited with {0}")]
    TypesetFailed(ExitStatus),

    #[error("output: {0}")]
    Output(#[source] io::Error),

    #[error("output: pager {pager:?} exited with {status}")]
    PagerFailed { pager: String, status: ExitStatus },
}

/// Typeset `source` and display the result.
pub async fn render<R>(source: &mut R, config: &RenderConfig) -> Result<(), RenderError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let width = crossterm::terminal::size().ok().map(|(cols, _)| cols);
    let page = typeset(source, line_length(width, config)).await?;
    output(&page, config).await
}

async fn typeset<R>(source: &mut R, columns: u16) -> Result<NamedTempFile, RenderError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let page = NamedTempFile::new().map_err(RenderError::Typeset)?;
    let stdout = page.reopen().map_err(RenderError::Typeset)?;

    // ASCII output keeps option dashes as HYPHEN-MINUS so they can be searched
    // for in the pager; SGR is disabled to get consistent overstriking.
    let mut child = Command::new("groff")
        .args(["-T", "ascii", "-m", "mandoc"])
        .arg(format!("-rLL={columns}n"))
        .env("GROFF_NO_SGR", "")
        .stdin(Stdio::piped())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(RenderError::Typeset)?;

    let copied = match child.stdin.take() {
        Some(mut stdin) => tokio::io::copy(source, &mut stdin).await,
        None => Err(io::Error::other("groff stdin unavailable")),
    };

    let status = child.wait().await.map_err(RenderError::Typeset)?;
    if !status.success() {
        return Err(RenderError::TypesetFailed(status));
    }
    let copied = copied.map_err(RenderError::Typeset)?;

    debug!(columns, input = copied, "Typeset page");
    Ok(page)
}

async fn output(page: &NamedTempFile, config: &RenderConfig) -> Result<(), RenderError> {
    if !io::stdout().is_terminal() {
        let mut file = tokio::fs::File::open(page.path())
            .await
            .map_err(RenderError::Output)?;
        let mut stdout = tokio::io::stdout();
        tokio::io::copy(&mut file, &mut stdout)
            .await
            .map_err(RenderError::Output)?;
        return stdout.flush().await.map_err(RenderError::Output);
    }

    let argv = pager_command_with(|name| std::env::var(name).ok(), config);
    let Some((program, args)) = argv.split_first() else {
        return Err(RenderError::Output(io::Error::other("empty pager command")));
    };

    let status = Command::new(program)
        .args(args)
        .arg(page.path())
        .status()
        .await
        .map_err(RenderError::Output)?;

    if !status.success() {
        return Err(RenderError::PagerFailed {
            pager: argv.join(" "),
            status,
        });
    }
    Ok(())
}

/// Line length for a terminal of `width` columns (if known).
pub fn line_length(width: Option<u16>, config: &RenderConfig) -> u16 {
    match width {
        Some(width) if width > 0 => width.min(config.max_columns),
        _ => config.default_columns,
    }
}

/// Pager argv: `MANPAGER`, then `PAGER`, then the configured pager, then
/// `less -is`.
///
/// Each command is split with shell quoting rules. A value that is blank or
/// does not parse (an unbalanced quote) is skipped.
pub fn pager_command_with(
    lookup: impl Fn(&str) -> Option<String>,
    config: &RenderConfig,
) -> Vec<String> {
    ["MANPAGER", "PAGER"]
        .iter()
        .filter_map(|name| lookup(name))
        .chain(config.pager.clone())
        .filter_map(|command| shlex::split(&command))
        .find(|argv| !argv.is_empty())
        .unwrap_or_else(|| DEFAULT_PAGER.iter().map(|s| s.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_line_length() {
        let config = RenderConfig::default();
        assert_eq!(line_length(None, &config), 78);
        assert_eq!(line_length(Some(0), &config), 78);
        assert_eq!(line_length(Some(100), &config), 100);
        assert_eq!(line_length(Some(400), &config), 150);
    }

    #[test]
    fn test_default_pager() {
        let argv = pager_command_with(no_env, &RenderConfig::default());
        assert_eq!(argv, vec!["less", "-is"]);
    }

    #[test]
    fn test_pager_precedence() {
        let config = RenderConfig {
            pager: Some("more".to_string()),
            ..Default::default()
        };
        assert_eq!(pager_command_with(no_env, &config), vec!["more"]);

        let pager_only = |name: &str| (name == "PAGER").then(|| "most -s".to_string());
        assert_eq!(pager_command_with(pager_only, &config), vec!["most", "-s"]);

        let both = |name: &str| match name {
            "MANPAGER" => Some("bat -l man".to_string()),
            "PAGER" => Some("most".to_string()),
            _ => None,
        };
        assert_eq!(pager_command_with(both, &config), vec!["bat", "-l", "man"]);
    }

    #[test]
    fn test_blank_pager_variable_is_ignored() {
        let blank = |name: &str| (name == "MANPAGER").then(|| "   ".to_string());
        assert_eq!(
            pager_command_with(blank, &RenderConfig::default()),
            vec!["less", "-is"]
        );
    }

    #[test]
    fn test_quoted_pager_command() {
        let manpager =
            |name: &str| (name == "MANPAGER").then(|| "sh -c 'col -bx | bat -l man -p'".to_string());
        assert_eq!(
            pager_command_with(manpager, &RenderConfig::default()),
            vec!["sh", "-c", "col -bx | bat -l man -p"]
        );
    }

    #[test]
    fn test_unparseable_pager_variable_is_skipped() {
        let lookup = |name: &str| match name {
            "MANPAGER" => Some("less '-R".to_string()),
            "PAGER" => Some("most -s".to_string()),
            _ => None,
        };
        assert_eq!(
            pager_command_with(lookup, &RenderConfig::default()),
            vec!["most", "-s"]
        );
    }
}
