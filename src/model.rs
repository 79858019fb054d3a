//! Model descriptors: per-type policy plus type-erased construction.
//!
//! A [`ModelDescriptor<M>`] is registered once per model type. Internally it is
//! stored as `Arc<dyn ModelEntry>` so the resolver can treat every model the
//! same way. Resolved instances are stored as `Arc<dyn Live>`; bindings
//! downcast them back to [`Shared<M>`].

use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::{self, CodecBuilder, CodecKind, CodecSettings, Customizer, SelfCodec};
use crate::error::BoxError;
use crate::types::ErrorPolicy;

/// The shared instance every binding of one resource observes.
pub type Shared<M> = Arc<RwLock<M>>;

/// A type that can be persisted as a configuration resource.
///
/// `Default` provides the instance used when nothing is stored yet.
pub trait ConfigModel: Default + Send + Sync + 'static {
    /// Post-construction hook, run after the instance is created or
    /// deserialized. Returning an error aborts the load or reload.
    fn init(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

type EncodeFn<M> = fn(&M, &CodecSettings) -> Result<String, BoxError>;
type DecodeFn<M> = fn(&str, &CodecSettings) -> Result<M, BoxError>;

/// Registration record for one model type.
pub struct ModelDescriptor<M> {
    default_resource: Option<String>,
    on_error: ErrorPolicy,
    init_on_reload: bool,
    codec: CodecKind,
    encode: EncodeFn<M>,
    decode: DecodeFn<M>,
    customizer: Option<Box<dyn Customizer>>,
    _phantom: PhantomData<fn() -> M>,
}

impl<M> ModelDescriptor<M>
where
    M: ConfigModel + Serialize + DeserializeOwned,
{
    /// Describe a model persisted with the JSON codec.
    pub fn json() -> Self {
        Self::with_codec(CodecKind::Json, codec::encode_json::<M>, codec::decode_json::<M>)
    }
}

impl<M> ModelDescriptor<M>
where
    M: ConfigModel + SelfCodec,
{
    /// Describe a model that encodes and decodes itself.
    pub fn self_codec() -> Self {
        Self::with_codec(CodecKind::SelfCodec, codec::encode_self::<M>, codec::decode_self::<M>)
    }
}

impl<M: ConfigModel> ModelDescriptor<M> {
    fn with_codec(codec: CodecKind, encode: EncodeFn<M>, decode: DecodeFn<M>) -> Self {
        Self {
            default_resource: None,
            on_error: ErrorPolicy::default(),
            init_on_reload: true,
            codec,
            encode,
            decode,
            customizer: None,
            _phantom: PhantomData,
        }
    }

    /// Path of a bundled template used when no resource file exists yet.
    /// An empty path means "no template".
    pub fn default_resource(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.default_resource = (!path.is_empty()).then_some(path);
        self
    }

    /// What to do when neither stored content nor the template can be used
    /// (default: [`ErrorPolicy::ThrowFatal`]).
    pub fn on_error(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    /// Whether [`ConfigModel::init`] also runs on reload (default: `true`).
    pub fn init_on_reload(mut self, on_reload: bool) -> Self {
        self.init_on_reload = on_reload;
        self
    }

    /// Register the model's codec customizer. Replaces any previous one.
    pub fn customizer(mut self, customizer: impl Customizer) -> Self {
        self.customizer = Some(Box::new(customizer));
        self
    }

    /// Closure form of [`customizer`](Self::customizer).
    pub fn customize<F>(self, f: F) -> Self
    where
        F: Fn(&mut CodecBuilder) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.customizer(f)
    }
}

/// Type-erased view of a [`ModelDescriptor`].
pub(crate) trait ModelEntry: Send + Sync {
    fn model_type(&self) -> TypeId;
    fn model_name(&self) -> &'static str;
    fn template_path(&self) -> Option<&str>;
    fn error_policy(&self) -> ErrorPolicy;
    fn runs_init_on_reload(&self) -> bool;
    fn codec_kind(&self) -> CodecKind;
    fn codec_customizer(&self) -> Option<&dyn Customizer>;
    /// A default-constructed instance.
    fn fresh(&self) -> Arc<dyn Live>;
    fn decode(&self, text: &str, settings: &CodecSettings) -> Result<Arc<dyn Live>, BoxError>;
}

impl<M: ConfigModel> ModelEntry for ModelDescriptor<M> {
    fn model_type(&self) -> TypeId {
        TypeId::of::<M>()
    }

    fn model_name(&self) -> &'static str {
        std::any::type_name::<M>()
    }

    fn template_path(&self) -> Option<&str> {
        self.default_resource.as_deref()
    }

    fn error_policy(&self) -> ErrorPolicy {
        self.on_error
    }

    fn runs_init_on_reload(&self) -> bool {
        self.init_on_reload
    }

    fn codec_kind(&self) -> CodecKind {
        self.codec
    }

    fn codec_customizer(&self) -> Option<&dyn Customizer> {
        self.customizer.as_deref()
    }

    fn fresh(&self) -> Arc<dyn Live> {
        Arc::new(Resident::new(M::default(), self.encode))
    }

    fn decode(&self, text: &str, settings: &CodecSettings) -> Result<Arc<dyn Live>, BoxError> {
        let model = (self.decode)(text, settings)?;
        Ok(Arc::new(Resident::new(model, self.encode)))
    }
}

/// A resolved instance, independent of its model type.
pub(crate) trait Live: Send + Sync {
    fn run_init(&self) -> Result<(), BoxError>;
    fn encode(&self, settings: &CodecSettings) -> Result<String, BoxError>;
    fn as_any(&self) -> &dyn Any;
}

pub(crate) struct Resident<M> {
    shared: Shared<M>,
    encode: EncodeFn<M>,
}

impl<M: ConfigModel> Resident<M> {
    fn new(model: M, encode: EncodeFn<M>) -> Self {
        Self {
            shared: Arc::new(RwLock::new(model)),
            encode,
        }
    }

    pub fn shared(&self) -> Shared<M> {
        Arc::clone(&self.shared)
    }
}

impl<M: ConfigModel> Live for Resident<M> {
    fn run_init(&self) -> Result<(), BoxError> {
        self.shared.write().init()
    }

    fn encode(&self, settings: &CodecSettings) -> Result<String, BoxError> {
        (self.encode)(&*self.shared.read(), settings)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Recover the typed handle of a resolved instance.
pub(crate) fn downcast<M: ConfigModel>(live: &dyn Live) -> Option<Shared<M>> {
    live.as_any()
        .downcast_ref::<Resident<M>>()
        .map(Resident::shared)
}
