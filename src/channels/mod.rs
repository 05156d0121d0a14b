//! Receiving side of the engine
//!
//! Matches inbound messages against the stored dialogues, picks at most one
//! and renders its answer into the channel. Per-channel state (activations,
//! predecessor windows, rate limits) lives in [`state`].

pub mod buffer;
pub mod render;
pub mod state;

use crate::core::session::Session;
use crate::core::traits::OutputSink;
use crate::core::weighting;
use crate::engine::Engine;
use anyhow::Result;
use buffer::MessageBuffer;
use futures::future::{BoxFuture, FutureExt};
use render::Token;
use state::SessionState;

/// Name of the built-in command that re-triggers matching
pub const DIALOGUE_COMMAND: &str = "dialogue";

/// Platform events that trigger dialogues with a synthetic question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Someone poked `target_id`
    Poke { target_id: String },
    /// A member joined the guild
    MemberAdded,
    /// A member left the guild
    MemberRemoved,
    /// A member received an honor such as `talkative`
    Honor(String),
}

impl Notice {
    /// Synthetic message content, or `None` when the bot should ignore it
    pub fn content(&self, session: &Session) -> Option<String> {
        let whom = if session.user_id == session.self_id {
            "self"
        } else {
            "others"
        };
        match self {
            Notice::Poke { target_id } => (*target_id == session.self_id).then(|| "hook:poke".to_string()),
            Notice::MemberAdded => Some(format!("hook:join:{whom}")),
            Notice::MemberRemoved => Some(format!("hook:leave:{whom}")),
            Notice::Honor(kind) => Some(format!("hook:{kind}:{whom}")),
        }
    }
}

/// Fill in the match test from the message; `false` drops it
fn build_test(engine: &Engine, state: &mut SessionState, session: &Session) -> bool {
    if session.user.authority < engine.config.authority.receive {
        return false;
    }
    let Ok(question) = engine.normalizer.strip_question(&session.content) else {
        return false;
    };
    let activated = state.is_activated();
    state.test.question = Some(question.parsed);
    state.test.original = Some(question.original);
    state.test.activated = question.activated;
    state.test.appellative = question.appellative || activated;
    true
}

/// Weight candidates the way a trigger would and return the total
///
/// Used for the probability epilog of searches.
pub async fn total_weight(engine: &Engine, state: &mut SessionState, session: &Session) -> f64 {
    engine.plugins.prepare(engine, state);
    if engine.plugins.attach_user(engine, state, session).await {
        return 0.0;
    }
    weighting::total_weight(&state.dialogues)
}

/// Match `session` against the stored dialogues and send the chosen answer
///
/// Returns whether an answer was rendered.
pub fn trigger_dialogue<'a>(
    engine: &'a Engine,
    session: &'a mut Session,
    sink: &'a dyn OutputSink,
) -> BoxFuture<'a, Result<bool>> {
    async move {
        if session.content.trim().is_empty() {
            return Ok(false);
        }
        let channel = engine.states.get_or_create(&session.channel_id, |state| {
            engine.plugins.init_state(engine, state)
        });
        let mut state = SessionState::new(channel, session.user_id.clone());
        if !build_test(engine, &mut state, session) {
            return Ok(false);
        }
        if engine.plugins.receive(engine, &mut state, session).await {
            return Ok(false);
        }
        tracing::debug!("[receive] {}", session.content);

        state.dialogues = engine.find(&state.test).await?;
        if state.dialogues.is_empty() {
            return Ok(false);
        }
        engine.plugins.prepare(engine, &mut state);
        if engine.plugins.attach_user(engine, &mut state, session).await {
            return Ok(false);
        }
        let Some(index) = weighting::select(&state.dialogues, engine.sampler.as_ref()) else {
            return Ok(false);
        };
        let dialogue = state.dialogues.swap_remove(index);
        tracing::debug!("[attach] {} -> #{}", session.content, dialogue.id);

        let mut answer = render::substitute(&dialogue.answer, session);
        if dialogue.is_regexp() {
            let capture = dialogue.meta.capture.clone().or_else(|| {
                render::recapture(
                    &dialogue.original,
                    state.test.original.as_deref().unwrap_or_default(),
                )
            });
            let Some(capture) = capture else {
                return Ok(false);
            };
            answer = render::apply_capture(&answer, &capture);
        }
        state.answer = Some(answer.clone());
        state.dialogues = vec![dialogue.clone()];
        state.dialogue = Some(dialogue);

        if engine.plugins.before_send(engine, &mut state, session).await {
            return Ok(false);
        }
        tracing::debug!("[send] {}", answer);

        session.redirected += 1;
        let buffer = MessageBuffer::new(sink);
        for token in render::tokenize(&answer) {
            match token {
                Token::Text(text) => buffer.write(&text),
                Token::Break => buffer.flush().await?,
                Token::Command(line) => execute(engine, session, &buffer, &line).await?,
            }
        }
        buffer.end().await?;
        engine.plugins.after_send(engine, &state, session).await;
        Ok(true)
    }
    .boxed()
}

/// Run a command interpolated into an answer
async fn execute(engine: &Engine, session: &Session, sink: &dyn OutputSink, line: &str) -> Result<()> {
    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    if name == DIALOGUE_COMMAND {
        if session.redirected > engine.config.trigger.max_redirections {
            tracing::debug!("Redirection limit reached for {}", rest);
            return Ok(());
        }
        let mut nested = session.with_content(rest.trim());
        trigger_dialogue(engine, &mut nested, sink).await?;
        return Ok(());
    }
    if !engine.executor.execute(line, session, sink).await? {
        tracing::debug!("Unknown command in answer: {}", name);
    }
    Ok(())
}
