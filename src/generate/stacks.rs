//! Built-in application stacks

use super::section::FileSection;
use crate::matcher::ListMode;
use std::collections::BTreeMap;

/// A language/runtime family that knows which of its paths matter.
pub trait AppStack: Send + Sync {
    fn name(&self) -> &'static str;

    fn section(&self, mode: ListMode) -> FileSection;
}

/// Name-indexed table of stacks, built once and passed by reference.
pub struct StackRegistry {
    stacks: BTreeMap<&'static str, Box<dyn AppStack>>,
}

impl StackRegistry {
    pub fn empty() -> Self {
        Self { stacks: BTreeMap::new() }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(NodeJs));
        registry.register(Box::new(NuxtJs));
        registry.register(Box::new(Python3));
        registry.register(Box::new(Ruby));
        registry
    }

    /// Add a stack; a stack with the same name is replaced.
    pub fn register(&mut self, stack: Box<dyn AppStack>) {
        self.stacks.insert(stack.name(), stack);
    }

    pub fn get(&self, name: &str) -> Option<&dyn AppStack> {
        self.stacks.get(name).map(|stack| stack.as_ref())
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stacks.keys().copied()
    }

    /// Look up every requested name, or return all that are unknown.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&dyn AppStack>, Vec<String>> {
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for name in names {
            match self.get(name.as_ref().trim()) {
                Some(stack) => found.push(stack),
                None => missing.push(name.as_ref().to_string()),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(missing)
        }
    }
}

impl Default for StackRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

const CERT_PACKAGE: &str = "certifi";

struct NodeJs;

impl AppStack for NodeJs {
    fn name(&self) -> &'static str {
        "nodejs"
    }

    fn section(&self, mode: ListMode) -> FileSection {
        let mut f = FileSection::new(mode);
        f.header("\n## NodeJS ##");
        f.comment("Package manager caches");
        f.drop("/root/.npm/**").drop("/home/*/.npm/**").drop("/usr/local/share/.cache/yarn/**");
        f.comment("Certs");
        f.keep("**/node_modules/**/*.pem");
        f
    }
}

struct NuxtJs;

impl AppStack for NuxtJs {
    fn name(&self) -> &'static str {
        "nuxtjs"
    }

    fn section(&self, mode: ListMode) -> FileSection {
        let mut f = FileSection::new(mode);
        f.header("\n## NuxtJS ##");
        f.comment("Config, build output and assets");
        f.keep("/app/nuxt.config.js")
            .keep("/app/dist/**")
            .keep("/app/.nuxt/**")
            .keep("/app/static/**")
            .keep("/app/content/**");
        f.comment("Certs");
        f.keep("**/node_modules/**/*.pem");
        f
    }
}

struct Python3;

impl AppStack for Python3 {
    fn name(&self) -> &'static str {
        "python3"
    }

    fn section(&self, mode: ListMode) -> FileSection {
        let mut f = FileSection::new(mode);
        f.header("\n## Python3 ##");
        f.comment("Bytecode and pip caches");
        f.drop("__pycache__/").drop("/root/.cache/pip/**");
        f.comment("Certs");
        f.keep(&format!("/**/{CERT_PACKAGE}/cacert.pem"));
        f.keep(&format!("/**/{CERT_PACKAGE}/**"));
        f
    }
}

struct Ruby;

impl AppStack for Ruby {
    fn name(&self) -> &'static str {
        "ruby"
    }

    fn section(&self, mode: ListMode) -> FileSection {
        let mut f = FileSection::new(mode);
        f.header("\n## Ruby ##");
        f.comment("Bundler caches");
        f.drop("/usr/local/bundle/cache/**").drop("/root/.gem/specs/**");
        f.comment("Certs");
        f.keep("/**/ssl_certs/**");
        f
    }
}
