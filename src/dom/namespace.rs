//! Namespace Resolution
//!
//! Stack-based namespace resolver used while a document is being built.

use super::strings::StringPool;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Namespace binding (prefix -> URI)
#[derive(Debug, Clone)]
struct NsBinding {
    prefix_id: u32,
    uri_id: u32,
    depth: u16,
}

/// Stack-based namespace resolver
///
/// Prefix id 0 stands for the default namespace; a binding to URI id 0
/// undeclares it (`xmlns=""`).
#[derive(Debug)]
pub struct NamespaceResolver {
    bindings: Vec<NsBinding>,
    depth: u16,
    xml_prefix_id: u32,
    xmlns_prefix_id: u32,
}

impl NamespaceResolver {
    /// Create a new namespace resolver with pre-declared xml and xmlns namespaces
    pub fn new(strings: &mut StringPool) -> Self {
        let xml_prefix_id = strings.intern("xml");
        let xmlns_prefix_id = strings.intern("xmlns");
        let xml_uri_id = strings.intern(ns::XML);
        let xmlns_uri_id = strings.intern(ns::XMLNS);

        NamespaceResolver {
            bindings: vec![
                NsBinding {
                    prefix_id: xml_prefix_id,
                    uri_id: xml_uri_id,
                    depth: 0,
                },
                NsBinding {
                    prefix_id: xmlns_prefix_id,
                    uri_id: xmlns_uri_id,
                    depth: 0,
                },
            ],
            depth: 0,
            xml_prefix_id,
            xmlns_prefix_id,
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, removing any bindings declared in it
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a namespace binding for the current scope
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32) {
        if prefix_id == self.xml_prefix_id || prefix_id == self.xmlns_prefix_id {
            return;
        }

        self.bindings.push(NsBinding {
            prefix_id,
            uri_id,
            depth: self.depth,
        });
    }

    /// Declare the default namespace for current scope
    pub fn declare_default(&mut self, uri_id: u32) {
        self.declare(0, uri_id);
    }

    /// Resolve a prefix to a namespace URI ID
    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix_id == prefix_id)
            .map(|b| b.uri_id)
            .filter(|&uri| uri != 0)
    }

    /// Resolve the default namespace
    pub fn resolve_default(&self) -> Option<u32> {
        self.resolve(0)
    }

    /// Bindings visible in the current scope as `(prefix_id, uri_id)`,
    /// outermost declaration first.
    ///
    /// Shadowed and undeclared bindings are left out, and so are the
    /// predeclared `xml` and `xmlns` prefixes.
    pub fn in_scope(&self) -> Vec<(u32, u32)> {
        self.bindings
            .iter()
            .enumerate()
            .filter(|(_, b)| {
                b.uri_id != 0 && b.prefix_id != self.xml_prefix_id && b.prefix_id != self.xmlns_prefix_id
            })
            .filter(|&(i, b)| !self.bindings[i + 1..].iter().any(|later| later.prefix_id == b.prefix_id))
            .map(|(_, b)| (b.prefix_id, b.uri_id))
            .collect()
    }

    /// Get current depth
    pub fn depth(&self) -> u16 {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespaces() {
        let mut strings = StringPool::new();
        let resolver = NamespaceResolver::new(&mut strings);

        let xml_id = strings.intern("xml");
        assert!(resolver.resolve(xml_id).is_some());
        assert_eq!(resolver.resolve_default(), None);
    }

    #[test]
    fn test_scope_pop() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);

        let prefix = strings.intern("foo");
        let uri = strings.intern("http://example.com/foo");

        resolver.push_scope();
        resolver.declare(prefix, uri);
        assert_eq!(resolver.resolve(prefix), Some(uri));

        resolver.pop_scope();
        assert_eq!(resolver.resolve(prefix), None);
        assert_eq!(resolver.depth(), 0);
    }

    #[test]
    fn test_shadow_binding() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);

        let prefix = strings.intern("ns");
        let uri1 = strings.intern("http://example.com/ns1");
        let uri2 = strings.intern("http://example.com/ns2");

        resolver.push_scope();
        resolver.declare(prefix, uri1);

        resolver.push_scope();
        resolver.declare(prefix, uri2);
        assert_eq!(resolver.resolve(prefix), Some(uri2));

        resolver.pop_scope();
        assert_eq!(resolver.resolve(prefix), Some(uri1));
    }

    #[test]
    fn test_in_scope_bindings() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);
        let x = strings.intern("x");
        let y = strings.intern("y");
        let uri_a = strings.intern("urn:a");
        let uri_b = strings.intern("urn:b");
        let uri_c = strings.intern("urn:c");
        assert!(resolver.in_scope().is_empty());

        resolver.push_scope();
        resolver.declare(x, uri_a);
        resolver.declare_default(uri_b);
        resolver.push_scope();
        resolver.declare(y, uri_c);
        resolver.declare(x, uri_c);
        resolver.declare_default(0);
        assert_eq!(resolver.in_scope(), vec![(y, uri_c), (x, uri_c)]);

        resolver.pop_scope();
        assert_eq!(resolver.in_scope(), vec![(x, uri_a), (0, uri_b)]);
    }

    #[test]
    fn test_default_undeclared() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);
        let uri = strings.intern("urn:a");

        resolver.push_scope();
        resolver.declare_default(uri);
        resolver.push_scope();
        resolver.declare_default(0);
        assert_eq!(resolver.resolve_default(), None);
        resolver.pop_scope();
        assert_eq!(resolver.resolve_default(), Some(uri));
    }
}
