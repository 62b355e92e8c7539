//! Events emitted by the session controller during a turn

use shellforge_core::DispatchEvent;
use shellforge_foundation::FunctionCall;

/// Turn progress, in the order it happens
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// `last` or `--resume` picked an existing session (`resumed`), or
    /// `--resume` found none and started `default`
    ChatResolved { chat_id: String, resumed: bool },

    /// Answer served from the response cache; the full text follows as `Text`
    CacheHit,

    /// Response text fragment
    Text(String),

    /// Function call requested by the model
    FunctionCall(FunctionCall),

    /// Function finished
    FunctionOutput { name: String, output: String },

    /// `auto` chat received its final name
    ChatRenamed { from: String, to: String },
}

impl From<DispatchEvent> for AgentEvent {
    fn from(event: DispatchEvent) -> Self {
        match event {
            DispatchEvent::Text(text) => AgentEvent::Text(text),
            DispatchEvent::FunctionCall(call) => AgentEvent::FunctionCall(call),
            DispatchEvent::FunctionOutput { name, output } => {
                AgentEvent::FunctionOutput { name, output }
            }
        }
    }
}
