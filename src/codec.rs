//! Serialization gateway: converts model instances to and from their
//! persisted text.
//!
//! Two codecs exist:
//!
//! - **Json** (default): serde_json structural encoding for any
//!   `Serialize + DeserializeOwned` model. A model may register one
//!   [`Customizer`] that adjusts the codec through a [`CodecBuilder`].
//! - **SelfCodec**: the model implements [`SelfCodec`] and the gateway
//!   delegates to it entirely. Customizers never apply to these models, so
//!   registering one is rejected.
//!
//! Customizers run at most once per model type per load/reload cycle. The
//! resulting [`CodecSettings`] are cached and reused by `save()` until the next
//! cycle starts.
//!
//! Unknown fields in stored JSON are detected with `serde_ignored`. They are
//! logged and dropped, or rejected when the model's codec is `strict`.

use std::any::TypeId;
use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{BoxError, StashfigError};
use crate::model::ModelEntry;

/// Which codec a model descriptor uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Json,
    SelfCodec,
}

/// A model that encodes and decodes itself instead of using the JSON codec.
pub trait SelfCodec: Sized {
    fn encode(&self) -> Result<String, BoxError>;
    fn decode(text: &str) -> Result<Self, BoxError>;
}

/// Per-model hook that configures the JSON codec before it is used for that
/// model.
pub trait Customizer: Send + Sync + 'static {
    fn customize(&self, builder: &mut CodecBuilder) -> Result<(), BoxError>;
}

impl<F> Customizer for F
where
    F: Fn(&mut CodecBuilder) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn customize(&self, builder: &mut CodecBuilder) -> Result<(), BoxError> {
        self(builder)
    }
}

/// Resolved JSON codec options for one model type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecSettings {
    pub pretty: bool,
    pub indent: usize,
    pub strict: bool,
    pub trailing_newline: bool,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: 2,
            strict: false,
            trailing_newline: true,
        }
    }
}

/// Builder handed to a [`Customizer`].
#[derive(Debug, Default)]
pub struct CodecBuilder {
    settings: CodecSettings,
}

impl CodecBuilder {
    /// Multi-line output (default: `true`).
    pub fn pretty(&mut self, pretty: bool) -> &mut Self {
        self.settings.pretty = pretty;
        self
    }

    /// Spaces per indentation level when pretty printing (default: 2).
    pub fn indent(&mut self, width: usize) -> &mut Self {
        self.settings.indent = width;
        self
    }

    /// Reject stored fields the model does not declare (default: `false`).
    pub fn strict(&mut self, strict: bool) -> &mut Self {
        self.settings.strict = strict;
        self
    }

    /// End the encoded text with a newline (default: `true`).
    pub fn trailing_newline(&mut self, on: bool) -> &mut Self {
        self.settings.trailing_newline = on;
        self
    }

    pub fn build(&self) -> CodecSettings {
        self.settings
    }
}

/// Unknown fields found while decoding in strict mode.
#[derive(Debug, thiserror::Error)]
#[error("Unknown field(s): {}", .0.join(", "))]
pub struct UnknownFields(pub Vec<String>);

pub(crate) fn encode_json<M: Serialize>(
    model: &M,
    settings: &CodecSettings,
) -> Result<String, BoxError> {
    let mut text = if settings.pretty {
        let indent = " ".repeat(settings.indent);
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        model.serialize(&mut ser)?;
        String::from_utf8(buf)?
    } else {
        serde_json::to_string(model)?
    };
    if settings.trailing_newline {
        text.push('\n');
    }
    Ok(text)
}

pub(crate) fn decode_json<M: DeserializeOwned>(
    text: &str,
    settings: &CodecSettings,
) -> Result<M, BoxError> {
    let mut unknown: Vec<String> = Vec::new();
    let mut de = serde_json::Deserializer::from_str(text);
    let model: M = serde_ignored::deserialize(&mut de, |path| unknown.push(path.to_string()))?;
    de.end()?;

    if !unknown.is_empty() {
        if settings.strict {
            return Err(Box::new(UnknownFields(unknown)));
        }
        warn!(target: "stashfig", "Ignoring unknown field(s): {}", unknown.join(", "));
    }
    Ok(model)
}

pub(crate) fn encode_self<M: SelfCodec>(
    model: &M,
    _settings: &CodecSettings,
) -> Result<String, BoxError> {
    model.encode()
}

pub(crate) fn decode_self<M: SelfCodec>(
    text: &str,
    _settings: &CodecSettings,
) -> Result<M, BoxError> {
    M::decode(text)
}

/// Check that a model's customizer, if any, can ever apply.
pub(crate) fn check_customizer(model: &dyn ModelEntry) -> Result<(), StashfigError> {
    if model.codec_customizer().is_some() && model.codec_kind() == CodecKind::SelfCodec {
        return Err(StashfigError::Customization {
            model: model.model_name(),
            reason: "customizers only apply to the JSON codec, but this model encodes itself"
                .into(),
        });
    }
    Ok(())
}

/// Per-cycle cache of codec settings, keyed by model type.
#[derive(Debug, Default)]
pub(crate) struct Gateway {
    settings: HashMap<TypeId, CodecSettings>,
}

impl Gateway {
    /// Forget cached settings so customizers run again in the new cycle.
    pub fn begin_cycle(&mut self) {
        self.settings.clear();
    }

    pub fn settings_for(&mut self, model: &dyn ModelEntry) -> Result<CodecSettings, StashfigError> {
        if let Some(settings) = self.settings.get(&model.model_type()) {
            return Ok(*settings);
        }

        check_customizer(model)?;
        let mut builder = CodecBuilder::default();
        if let Some(customizer) = model.codec_customizer() {
            customizer
                .customize(&mut builder)
                .map_err(|e| StashfigError::Customization {
                    model: model.model_name(),
                    reason: e.to_string(),
                })?;
        }

        let settings = builder.build();
        self.settings.insert(model.model_type(), settings);
        Ok(settings)
    }
}
