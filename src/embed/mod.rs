//! Embedded static resources.
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Live reload client, minified at build time
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{LIVERELOAD_JS, LiveReloadVars};
//!
//! let js = LIVERELOAD_JS.render(&LiveReloadVars { ws_port: 35729 });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// Request path the injected `<script>` loads the client from.
    pub const LIVERELOAD_PATH: &str = "/__gild/livereload.js";

    /// Variables for the live reload client.
    pub struct LiveReloadVars {
        pub ws_port: u16,
    }

    impl TemplateVars for LiveReloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__GILD_WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Live reload client (minified by build.rs).
    pub const LIVERELOAD_JS: Template<LiveReloadVars> =
        Template::new(include_str!(concat!(env!("OUT_DIR"), "/livereload.min.js")));

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_port_injected() {
            let js = LIVERELOAD_JS.render(&LiveReloadVars { ws_port: 35730 });
            assert!(js.contains("35730"));
            assert!(!js.contains("__GILD_WS_PORT__"));
        }
    }
}
