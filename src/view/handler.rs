//! Handler sets: the producers registered for one (route, method) pair.
//!
//! # Responsibilities
//! - Map media types to response producers, in registration order
//! - Map RMI method names to producers, gated by an explicit accept-list
//! - Own the optional pre-request hook and content matrix
//! - Register the generated client-proxy block under its reserved media type
//!
//! # Design Decisions
//! - Producers are boxed async closures; the builder hides the boxing
//! - `build()` validates the content matrix so faults surface at startup

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::dispatch::rmi::RmiCall;
use crate::http::{HttpRequest, HttpResponse};
use crate::negotiation::ANY_MEDIA_TYPE;
use crate::view::content::{BlockOutput, ContentBlock, ContentError, ContentMatrix, ContentMatrixBuilder};

/// Media type of the generated client proxy script.
pub const PROXY_MEDIA_TYPE: &str = "text/javascript";

/// Reserved template holding the client proxy script.
pub const PROXY_TEMPLATE: &str = "client-proxy";

/// Locale used for the proxy block when the handler set has no other content.
const FALLBACK_LOCALE: &str = "en-us";

/// What a producer receives.
#[derive(Debug)]
pub struct Exchange {
    pub request: HttpRequest,
    pub response: HttpResponse,
    /// Value handed over by the pre-request hook.
    pub prelude: Option<Value>,
}

/// Outcome of a pre-request hook.
#[derive(Debug)]
pub enum PreRequest {
    /// Proceed to the producer with this value.
    Continue(Value),
    /// Short-circuit with this response.
    Respond(HttpResponse),
}

pub type Producer = Arc<dyn Fn(Exchange) -> BoxFuture<'static, HttpResponse> + Send + Sync>;
pub type RmiProducer = Arc<dyn Fn(RmiCall) -> BoxFuture<'static, HttpResponse> + Send + Sync>;
pub type PreRequestHook = Arc<dyn Fn(&HttpRequest) -> BoxFuture<'static, PreRequest> + Send + Sync>;

pub struct HandlerSet {
    name: String,
    by_media_type: Vec<(String, Producer)>,
    by_rmi_method: HashMap<String, RmiProducer>,
    pre_request: Option<PreRequestHook>,
    rmi_accept: Vec<String>,
    proxy_registered: bool,
    content: Option<Arc<ContentMatrix>>,
}

impl HandlerSet {
    pub fn builder(name: impl Into<String>) -> HandlerSetBuilder {
        HandlerSetBuilder {
            name: name.into(),
            by_media_type: Vec::new(),
            by_rmi_method: HashMap::new(),
            pre_request: None,
            rmi_accept: Vec::new(),
            proxy: None,
            content: ContentMatrix::builder(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn producer(&self, media_type: &str) -> Option<&Producer> {
        self.by_media_type
            .iter()
            .find(|(m, _)| m == media_type)
            .map(|(_, p)| p)
    }

    /// Registered concrete media types in registration order, without the
    /// proxy key and without `*/*`.
    pub fn negotiable_media_types(&self) -> impl Iterator<Item = &str> {
        self.by_media_type
            .iter()
            .map(|(m, _)| m.as_str())
            .filter(move |m| *m != ANY_MEDIA_TYPE && !(self.proxy_registered && *m == PROXY_MEDIA_TYPE))
    }

    pub fn has_proxy(&self) -> bool {
        self.proxy_registered
    }

    /// Producer for an RMI method, only if the method is on the accept-list.
    pub fn rmi_producer(&self, method: &str) -> Option<&RmiProducer> {
        if !self.rmi_accept.iter().any(|m| m == method) {
            return None;
        }
        self.by_rmi_method.get(method)
    }

    pub fn rmi_accept(&self) -> &[String] {
        &self.rmi_accept
    }

    pub fn pre_request(&self) -> Option<&PreRequestHook> {
        self.pre_request.as_ref()
    }

    pub fn content(&self) -> Option<&Arc<ContentMatrix>> {
        self.content.as_ref()
    }
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSet")
            .field("name", &self.name)
            .field(
                "media_types",
                &self.by_media_type.iter().map(|(m, _)| m.as_str()).collect::<Vec<_>>(),
            )
            .field("rmi_methods", &self.by_rmi_method.keys().collect::<Vec<_>>())
            .field("rmi_accept", &self.rmi_accept)
            .field("pre_request", &self.pre_request.is_some())
            .field("content", &self.content.is_some())
            .finish()
    }
}

/// Build phase of a [`HandlerSet`].
pub struct HandlerSetBuilder {
    name: String,
    by_media_type: Vec<(String, Producer)>,
    by_rmi_method: HashMap<String, RmiProducer>,
    pre_request: Option<PreRequestHook>,
    rmi_accept: Vec<String>,
    proxy: Option<ContentBlock>,
    content: ContentMatrixBuilder,
}

impl HandlerSetBuilder {
    /// Register `producer` for `media_type`. Re-registering replaces.
    pub fn on<F, Fut>(mut self, media_type: impl Into<String>, producer: F) -> Self
    where
        F: Fn(Exchange) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        let media_type = media_type.into();
        let producer: Producer = Arc::new(move |exchange| producer(exchange).boxed());
        match self.by_media_type.iter().position(|(m, _)| *m == media_type) {
            Some(i) => {
                tracing::warn!(handler = %self.name, media_type = %media_type, "Producer replaced");
                self.by_media_type[i].1 = producer;
            }
            None => self.by_media_type.push((media_type, producer)),
        }
        self
    }

    /// Register a producer that renders the default template.
    pub fn render_on(self, media_type: impl Into<String>) -> Self {
        self.on(media_type, |exchange: Exchange| async move {
            exchange.response.ok().render(None, None)
        })
    }

    /// Register `producer` for the RMI method `method`. The method must also be
    /// on the accept-list to be invocable.
    pub fn on_rmi<F, Fut>(mut self, method: impl Into<String>, producer: F) -> Self
    where
        F: Fn(RmiCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        let producer: RmiProducer = Arc::new(move |call| producer(call).boxed());
        self.by_rmi_method.insert(method.into(), producer);
        self
    }

    /// Replace the RMI accept-list.
    pub fn rmi_accept<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rmi_accept = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn pre_request<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(&HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PreRequest> + Send + 'static,
    {
        let hook: PreRequestHook = Arc::new(move |request: &HttpRequest| hook(request).boxed());
        self.pre_request = Some(hook);
        self
    }

    /// Attach a content matrix, replacing any earlier one.
    pub fn content(mut self, matrix: ContentMatrixBuilder) -> Self {
        self.content = matrix;
        self
    }

    /// Serve a generated client proxy under [`PROXY_MEDIA_TYPE`] and make
    /// `methods` the RMI accept-list.
    pub fn client_proxy<F, I, S>(mut self, script: F, methods: I) -> Self
    where
        F: Fn(Option<&Value>) -> BlockOutput + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.proxy = Some(ContentBlock::from_fn(script));
        self.rmi_accept(methods)
    }

    pub fn build(self) -> Result<HandlerSet, ContentError> {
        let mut builder = self;
        let mut content = std::mem::take(&mut builder.content);
        let proxy_registered = builder.proxy.is_some();

        if let Some(block) = builder.proxy.take() {
            let locale = content
                .default_locale_tag()
                .unwrap_or(FALLBACK_LOCALE)
                .to_string();
            content.insert(
                PROXY_TEMPLATE.to_string(),
                locale,
                PROXY_MEDIA_TYPE.to_string(),
                block,
            );
            builder = builder.on(PROXY_MEDIA_TYPE, |exchange: Exchange| async move {
                exchange
                    .response
                    .ok()
                    .no_store_cache()
                    .render(Some(PROXY_TEMPLATE), None)
            });
        }

        let content = if content.is_empty() {
            None
        } else {
            Some(Arc::new(content.build()?))
        };

        tracing::debug!(
            handler = %builder.name,
            media_types = builder.by_media_type.len(),
            rmi_methods = builder.by_rmi_method.len(),
            "Handler set built"
        );

        Ok(HandlerSet {
            name: builder.name,
            by_media_type: builder.by_media_type,
            by_rmi_method: builder.by_rmi_method,
            pre_request: builder.pre_request,
            rmi_accept: builder.rmi_accept,
            proxy_registered,
            content,
        })
    }
}
