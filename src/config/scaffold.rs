//! First-run creation of a minimal `quack.yaml`.
use anyhow::{Context as _, Result};
use std::io::{BufRead, Write};
use std::path::Path;

use super::Config;

/// Render the minimal configuration for a new project.
#[must_use]
pub fn template(project_name: &str) -> String {
    format!(
        "name: {project_name}\n\
         modules:\n\
         profiles:\n  \
           init:\n    \
             tasks: ['modules']\n"
    )
}

fn ask(input: &mut impl BufRead, output: &mut impl Write, question: &str) -> Result<String> {
    write!(output, "{question}").context("writing prompt")?;
    output.flush().context("flushing prompt")?;
    let mut answer = String::new();
    input.read_line(&mut answer).context("reading answer")?;
    Ok(answer.trim().to_string())
}

/// Offer to create a configuration at `path`.
///
/// Returns the freshly written configuration if the user accepted, `None`
/// otherwise.
///
/// # Errors
///
/// Returns an error if the prompt cannot be written, the answer cannot be
/// read, or the file cannot be written.
pub fn prompt_to_create(
    path: &Path,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<Option<Config>> {
    let answer = ask(
        input,
        output,
        "No quack configuration found, do you want to create one? (y/N): ",
    )?;
    if !answer.eq_ignore_ascii_case("y") {
        return Ok(None);
    }

    let name = ask(input, output, "Provide project name: ")?;
    let content = template(&name);
    std::fs::write(path, &content).with_context(|| format!("writing {}", path.display()))?;
    let config = Config::from_yaml(&content)
        .with_context(|| format!("parsing generated {}", path.display()))?;
    Ok(Some(config))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn template_layout() {
        insta::assert_snapshot!(template("duck"), @r"
        name: duck
        modules:
        profiles:
          init:
            tasks: ['modules']
        ");
    }

    #[test]
    fn accepting_writes_and_loads_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quack.yaml");
        let mut input = Cursor::new("Y\nduck\n");
        let mut output = Vec::new();

        let config = prompt_to_create(&path, &mut input, &mut output)
            .unwrap()
            .expect("config should be created");

        assert_eq!(config.name.as_deref(), Some("duck"));
        assert!(config.modules.is_empty());
        assert_eq!(config.profile("init").unwrap().tasks, vec!["modules"]);
        assert!(path.exists());
        let prompt = String::from_utf8(output).unwrap();
        assert!(prompt.contains("do you want to create one?"));
        assert!(prompt.contains("Provide project name"));
    }

    #[test]
    fn declining_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quack.yaml");
        let mut input = Cursor::new("n\n");
        let mut output = Vec::new();

        let result = prompt_to_create(&path, &mut input, &mut output).unwrap();

        assert!(result.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn empty_answer_declines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quack.yaml");
        let mut input = Cursor::new("");
        let result = prompt_to_create(&path, &mut input, &mut Vec::new()).unwrap();
        assert!(result.is_none());
    }
}
