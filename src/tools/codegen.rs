//! HDL module text generation for a part's interface.
//!
//! The entity block comes from the part's ports. The architecture body is
//! either templated from the behavior description or supplied by an external
//! `BodyGenerator`.

use crate::core::components::part::Part;
use crate::core::components::port_specs::Direction;
use log::warn;
use std::thread;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("generator quota exceeded")]
    QuotaExceeded,

    #[error("model '{0}' not found")]
    ModelNotFound(String),

    #[error("generator service error: {0}")]
    Service(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodegenError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("body generation failed: {0}")]
    Generator(#[from] GeneratorError),

    #[error("body generation failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: GeneratorError,
    },
}

/// External producer of architecture bodies, such as a language model client
pub trait BodyGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;
}

impl<F> BodyGenerator for F
where
    F: Fn(&str) -> Result<String, GeneratorError>,
{
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        self(prompt)
    }
}

/// Retries quota failures with a fixed backoff; other failures are terminal
pub struct RetryingGenerator<G> {
    inner: G,
    max_attempts: u32,
    backoff: Duration,
}

impl<G: BodyGenerator> RetryingGenerator<G> {
    pub fn new(inner: G, max_attempts: u32, backoff: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn generate_with_retries(&self, prompt: &str) -> Result<String, CodegenError> {
        let mut attempt = 1;
        loop {
            match self.inner.generate(prompt) {
                Ok(text) => return Ok(text),
                Err(GeneratorError::QuotaExceeded) if attempt < self.max_attempts => {
                    warn!(
                        "Quota exceeded (attempt {}/{}), retrying in {:?}",
                        attempt, self.max_attempts, self.backoff
                    );
                    thread::sleep(self.backoff);
                    attempt += 1;
                }
                Err(GeneratorError::QuotaExceeded) => {
                    return Err(CodegenError::RetriesExhausted {
                        attempts: attempt,
                        source: GeneratorError::QuotaExceeded,
                    })
                }
                Err(other) => return Err(CodegenError::Generator(other)),
            }
        }
    }
}

impl<G: BodyGenerator> BodyGenerator for RetryingGenerator<G> {
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        self.generate_with_retries(prompt).map_err(|e| match e {
            CodegenError::Generator(inner) => inner,
            CodegenError::RetriesExhausted { source, .. } => source,
            CodegenError::UnsupportedLanguage(l) => GeneratorError::Service(l),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CodegenOptions {
    pub language: String,
    /// Defaults to the lowercased class name of the part
    pub entity_name: Option<String>,
    pub architecture_name: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            language: "VHDL".to_string(),
            entity_name: None,
            architecture_name: "rtl".to_string(),
        }
    }
}

impl CodegenOptions {
    pub fn with_entity_name(mut self, name: &str) -> Self {
        self.entity_name = Some(name.to_string());
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }
}

fn entity_block(entity: &str, part: &Part) -> String {
    let ports: Vec<String> = part
        .ports()
        .by_direction(Direction::Input)
        .chain(part.ports().by_direction(Direction::Output))
        .map(|p| {
            let direction = match p.direction() {
                Direction::Input => "in",
                Direction::Output => "out",
            };
            format!("        {} : {} STD_LOGIC", p.name(), direction)
        })
        .collect();

    let mut out = String::new();
    out.push_str("library IEEE;\nuse IEEE.STD_LOGIC_1164.ALL;\n\n");
    out.push_str(&format!("entity {} is\n", entity));
    if !ports.is_empty() {
        out.push_str("    port (\n");
        out.push_str(&ports.join(";\n"));
        out.push_str("\n    );\n");
    }
    out.push_str(&format!("end {};\n", entity));
    out
}

fn prompt(part: &Part, entity: &str) -> String {
    let mut text = format!(
        "Write the VHDL architecture body (statements between 'begin' and 'end') for entity '{}'.\n",
        entity
    );
    text.push_str("Reply with VHDL only. The behavior to implement is:\n");
    for line in part.describe() {
        text.push_str(&format!("  {}\n", line));
    }
    text
}

fn strip_code_fences(reply: &str) -> String {
    reply
        .replace("```vhdl", "")
        .replace("```VHDL", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Render a module description of `part` in the requested language
pub fn generate_code(
    part: &Part,
    options: &CodegenOptions,
    generator: Option<&dyn BodyGenerator>,
) -> Result<String, CodegenError> {
    if !options.language.eq_ignore_ascii_case("VHDL") {
        return Err(CodegenError::UnsupportedLanguage(options.language.clone()));
    }
    let entity = options
        .entity_name
        .clone()
        .unwrap_or_else(|| part.class().to_lowercase());
    let architecture = &options.architecture_name;

    let body = match generator {
        Some(generator) => {
            let reply = generator.generate(&prompt(part, &entity))?;
            strip_code_fences(&reply)
                .lines()
                .map(|l| format!("    {}", l))
                .collect::<Vec<_>>()
                .join("\n")
        }
        None => {
            let lines = part.describe();
            if lines.is_empty() {
                "    -- no behavior description available".to_string()
            } else {
                lines
                    .iter()
                    .map(|l| format!("    -- {}", l))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    };

    Ok(format!(
        "{}\narchitecture {} of {} is\nbegin\n\n{}\n\nend {};\n",
        entity_block(&entity, part),
        architecture,
        entity,
        body,
        architecture
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::components::{behavior_fn, LeafBuilder, PortSpec};
    use std::cell::Cell;

    fn register() -> Part {
        LeafBuilder::new("dut", "Register")
            .port(PortSpec::output("out_0"))
            .port(PortSpec::input("clk"))
            .port(PortSpec::input("in_0"))
            .build(behavior_fn(|_| Ok(())))
            .unwrap()
    }

    #[test]
    fn test_entity_lists_inputs_then_outputs() {
        let text = generate_code(&register(), &CodegenOptions::default(), None).unwrap();
        let clk = text.find("clk : in STD_LOGIC").unwrap();
        let in_0 = text.find("in_0 : in STD_LOGIC").unwrap();
        let out_0 = text.find("out_0 : out STD_LOGIC").unwrap();
        assert!(clk < in_0 && in_0 < out_0, "Inputs come before outputs:\n{}", text);
        assert!(text.contains("entity register is"), "Entity defaults to the lowercased class name");
        assert!(text.contains("architecture rtl of register is"));
        assert!(text.trim_end().ends_with("end rtl;"));
    }

    #[test]
    fn test_language_is_case_insensitive() {
        let options = CodegenOptions::default().with_language("vhdl");
        assert!(generate_code(&register(), &options, None).is_ok());
        let options = CodegenOptions::default().with_language("Verilog");
        assert_eq!(
            generate_code(&register(), &options, None),
            Err(CodegenError::UnsupportedLanguage("Verilog".to_string()))
        );
    }

    #[test]
    fn test_generator_reply_is_unfenced_and_indented() {
        let generator = |_: &str| -> Result<String, GeneratorError> {
            Ok("```vhdl\nout_0 <= in_0;\n```".to_string())
        };
        let options = CodegenOptions::default().with_entity_name("reg");
        let text = generate_code(&register(), &options, Some(&generator)).unwrap();
        assert!(text.contains("begin\n\n    out_0 <= in_0;\n\nend rtl;"), "Got:\n{}", text);
        assert!(!text.contains("```"));
    }

    #[test]
    fn test_quota_errors_are_retried() {
        let calls = Cell::new(0);
        let flaky = |_: &str| -> Result<String, GeneratorError> {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(GeneratorError::QuotaExceeded)
            } else {
                Ok("null;".to_string())
            }
        };
        let retrying = RetryingGenerator::new(flaky, 3, Duration::from_millis(1));
        assert_eq!(retrying.generate_with_retries("p").unwrap(), "null;");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_retries_are_bounded() {
        let calls = Cell::new(0);
        let exhausted = |_: &str| -> Result<String, GeneratorError> {
            calls.set(calls.get() + 1);
            Err(GeneratorError::QuotaExceeded)
        };
        let retrying = RetryingGenerator::new(exhausted, 2, Duration::from_millis(1));
        let result = retrying.generate_with_retries("p");
        assert!(matches!(result, Err(CodegenError::RetriesExhausted { attempts: 2, .. })));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_model_not_found_is_terminal() {
        let calls = Cell::new(0);
        let missing = |_: &str| -> Result<String, GeneratorError> {
            calls.set(calls.get() + 1);
            Err(GeneratorError::ModelNotFound("m".to_string()))
        };
        let retrying = RetryingGenerator::new(missing, 5, Duration::from_millis(1));
        let result = generate_code(&register(), &CodegenOptions::default(), Some(&retrying));
        assert_eq!(
            result,
            Err(CodegenError::Generator(GeneratorError::ModelNotFound("m".to_string())))
        );
        assert_eq!(calls.get(), 1);
    }
}
