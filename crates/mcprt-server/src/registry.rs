//! Resource/resource-template/tool registration (spec §4.9, Supplemented
//! host-facing API). A single `parking_lot::RwLock`-guarded map per kind,
//! matching the "each hashtable has its own mutex" shared-resource policy
//! in spec §5.

use mcprt_cache::config::Ttl;
use mcprt_protocol::{Resource, ResourceTemplate, Tool};
use parking_lot::RwLock;

use crate::handlers::{SharedResourceHandler, SharedToolHandler};

struct ResourceEntry {
    resource: Resource,
    handler: SharedResourceHandler,
    cacheable: bool,
    ttl: Ttl,
}

struct TemplateEntry {
    template: ResourceTemplate,
    handler: SharedResourceHandler,
    cacheable: bool,
    ttl: Ttl,
}

struct ToolEntry {
    tool: Tool,
    handler: SharedToolHandler,
}

#[derive(Default)]
struct Inner {
    resources: Vec<ResourceEntry>,
    templates: Vec<TemplateEntry>,
    tools: Vec<ToolEntry>,
    fallback: Option<SharedResourceHandler>,
}

/// What a `read_resource` lookup resolved to: the handler to invoke, plus
/// whether the result should be cached and for how long.
pub struct ResourceResolution {
    pub handler: SharedResourceHandler,
    pub cacheable: bool,
    pub ttl: Ttl,
}

#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resource(
        &self,
        resource: Resource,
        handler: SharedResourceHandler,
        cacheable: bool,
        ttl: Ttl,
    ) {
        let mut inner = self.inner.write();
        inner.resources.retain(|e| e.resource.uri != resource.uri);
        inner.resources.push(ResourceEntry {
            resource,
            handler,
            cacheable,
            ttl,
        });
    }

    pub fn register_resource_template(
        &self,
        template: ResourceTemplate,
        handler: SharedResourceHandler,
        cacheable: bool,
        ttl: Ttl,
    ) {
        self.inner.write().templates.push(TemplateEntry {
            template,
            handler,
            cacheable,
            ttl,
        });
    }

    pub fn set_fallback_resource_handler(&self, handler: SharedResourceHandler) {
        self.inner.write().fallback = Some(handler);
    }

    pub fn register_tool(&self, tool: Tool, handler: SharedToolHandler) {
        let mut inner = self.inner.write();
        inner.tools.retain(|e| e.tool.name != tool.name);
        inner.tools.push(ToolEntry { tool, handler });
    }

    pub fn list_resources(&self) -> Vec<Resource> {
        self.inner.read().resources.iter().map(|e| e.resource.clone()).collect()
    }

    pub fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        self.inner.read().templates.iter().map(|e| e.template.clone()).collect()
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        self.inner.read().tools.iter().map(|e| e.tool.clone()).collect()
    }

    pub fn get_tool(&self, name: &str) -> Option<(Tool, SharedToolHandler)> {
        self.inner
            .read()
            .tools
            .iter()
            .find(|e| e.tool.name == name)
            .map(|e| (e.tool.clone(), e.handler.clone()))
    }

    /// Resolve a `read_resource` URI per spec §4.9 step 5: static lookup,
    /// then the first matching template in registration order, then the
    /// fallback handler.
    pub fn resolve_resource(&self, uri: &str) -> Option<ResourceResolution> {
        let inner = self.inner.read();

        if let Some(entry) = inner.resources.iter().find(|e| e.resource.uri == uri) {
            return Some(ResourceResolution {
                handler: entry.handler.clone(),
                cacheable: entry.cacheable,
                ttl: entry.ttl,
            });
        }

        if let Some(entry) = inner.templates.iter().find(|e| e.template.matches(uri).is_some()) {
            return Some(ResourceResolution {
                handler: entry.handler.clone(),
                cacheable: entry.cacheable,
                ttl: entry.ttl,
            });
        }

        inner.fallback.as_ref().map(|handler| ResourceResolution {
            handler: handler.clone(),
            cacheable: false,
            ttl: Ttl::Default,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcprt_protocol::ContentItem;
    use std::sync::Arc;

    fn handler() -> SharedResourceHandler {
        Arc::new(|_uri: &str| async { Ok(vec![ContentItem::text("text/plain", "x")]) })
    }

    #[test]
    fn static_resource_wins_over_template() {
        let registry = Registry::new();
        registry.register_resource_template(
            ResourceTemplate::new("file:///{path}"),
            handler(),
            false,
            Ttl::Default,
        );
        registry.register_resource(Resource::new("file:///etc"), handler(), true, Ttl::Default);

        let resolution = registry.resolve_resource("file:///etc").unwrap();
        assert!(resolution.cacheable);
    }

    #[test]
    fn first_matching_template_in_registration_order_wins() {
        let registry = Registry::new();
        registry.register_resource_template(
            ResourceTemplate::new("a://{x}"),
            handler(),
            true,
            Ttl::Default,
        );
        registry.register_resource_template(
            ResourceTemplate::new("a://{x}"),
            handler(),
            false,
            Ttl::Default,
        );

        let resolution = registry.resolve_resource("a://z").unwrap();
        assert!(resolution.cacheable);
    }

    #[test]
    fn unmatched_uri_without_fallback_resolves_to_none() {
        let registry = Registry::new();
        assert!(registry.resolve_resource("nope://x").is_none());
    }

    #[test]
    fn unmatched_uri_falls_back_when_registered() {
        let registry = Registry::new();
        registry.set_fallback_resource_handler(handler());
        assert!(registry.resolve_resource("nope://x").is_some());
    }
}
