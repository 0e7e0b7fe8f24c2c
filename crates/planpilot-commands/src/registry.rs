use crate::validate::validate_args;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Outcome of a dispatched command, as handed back to the host loop.
/// Errors are values: the host feeds them into the agent's context
/// instead of tearing down the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Text(String),
    Json(Value),
    Error(String),
}

impl CommandReply {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Flatten to the string form the host injects into the agent's
    /// context.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Json(value) => value.to_string(),
            Self::Error(message) => format!("Error: {message}"),
        }
    }
}

pub type CommandHandler = Box<dyn Fn(&Map<String, Value>) -> CommandReply>;

/// A named command with its argument schema, as announced to the host.
#[derive(Debug, Clone, Serialize)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    /// JSON-schema-like object description of the arguments.
    pub parameters: Value,
}

struct RegisteredCommand {
    spec: CommandSpec,
    handler: CommandHandler,
}

/// The host side of command registration: whatever prompt generator the
/// agent host uses to advertise callable commands to the model.
pub trait PromptHost {
    fn add_command(&mut self, spec: &CommandSpec);
}

/// Stateless name → handler router. Owns no business state; everything
/// interesting lives behind the handlers.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, RegisteredCommand>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per command at startup. Re-registering a name
    /// replaces the previous binding.
    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        parameters: Value,
        handler: CommandHandler,
    ) {
        self.commands.insert(
            name.to_string(),
            RegisteredCommand {
                spec: CommandSpec {
                    name: name.to_string(),
                    description: description.to_string(),
                    parameters,
                },
                handler,
            },
        );
    }

    pub fn specs(&self) -> Vec<&CommandSpec> {
        self.commands.values().map(|cmd| &cmd.spec).collect()
    }

    /// Announce every registered command to the host prompt generator.
    pub fn install_into(&self, host: &mut dyn PromptHost) {
        for command in self.commands.values() {
            host.add_command(&command.spec);
        }
    }

    /// Resolve and run a command. Unknown names and argument mismatches
    /// come back as `CommandReply::Error`.
    pub fn dispatch(&self, name: &str, args: &Value) -> CommandReply {
        let Some(command) = self.commands.get(name) else {
            return CommandReply::Error(format!("unknown command '{name}'"));
        };
        let args = match args {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return CommandReply::Error(format!(
                    "arguments for '{name}' must be a JSON object, got {other}"
                ));
            }
        };
        if let Err(message) = validate_args(&command.spec, &args) {
            return CommandReply::Error(format!("invalid arguments for '{name}': {message}"));
        }
        (command.handler)(&args)
    }
}
