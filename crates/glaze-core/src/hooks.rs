//! Typed extension hooks.
//!
//! Hosts that understand a vendor extension implement [`ExtensionHook`] to
//! read it on import or write it on export. The codec calls the hook once per
//! node, material and animation channel, after the entity is fully populated
//! and before it is placed into its parent array. The hook sees the entity
//! read-only and may edit its extension bag.

use crate::document::{Channel, Extensions, Material, Node};
use crate::errors::Result;

/// Direction of the codec call that invoked a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    Import,
    Export,
}

/// Position of the entity handed to a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookContext {
    pub phase: HookPhase,
    /// Index of the entity in its top-level array.
    pub index: usize,
    /// Owning animation, for channel hooks.
    pub animation: Option<usize>,
}

impl HookContext {
    pub fn new(phase: HookPhase, index: usize) -> Self {
        Self {
            phase,
            index,
            animation: None,
        }
    }

    pub fn channel(phase: HookPhase, animation: usize, channel: usize) -> Self {
        Self {
            phase,
            index: channel,
            animation: Some(animation),
        }
    }
}

/// Per-entity extension callbacks. Every method defaults to a no-op.
pub trait ExtensionHook {
    fn node(&mut self, ctx: &HookContext, node: &Node, bag: &mut Extensions) -> Result<()> {
        let _ = (ctx, node, bag);
        Ok(())
    }

    fn material(
        &mut self,
        ctx: &HookContext,
        material: &Material,
        bag: &mut Extensions,
    ) -> Result<()> {
        let _ = (ctx, material, bag);
        Ok(())
    }

    fn animation_channel(
        &mut self,
        ctx: &HookContext,
        channel: &Channel,
        bag: &mut Extensions,
    ) -> Result<()> {
        let _ = (ctx, channel, bag);
        Ok(())
    }
}

/// Hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ExtensionHook for NoHooks {}

/// Runs several hooks in order; the first failure stops the chain.
#[derive(Default)]
pub struct HookChain<'a> {
    hooks: Vec<&'a mut dyn ExtensionHook>,
}

impl<'a> HookChain<'a> {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn with(mut self, hook: &'a mut dyn ExtensionHook) -> Self {
        self.hooks.push(hook);
        self
    }
}

impl ExtensionHook for HookChain<'_> {
    fn node(&mut self, ctx: &HookContext, node: &Node, bag: &mut Extensions) -> Result<()> {
        for hook in &mut self.hooks {
            hook.node(ctx, node, bag)?;
        }
        Ok(())
    }

    fn material(
        &mut self,
        ctx: &HookContext,
        material: &Material,
        bag: &mut Extensions,
    ) -> Result<()> {
        for hook in &mut self.hooks {
            hook.material(ctx, material, bag)?;
        }
        Ok(())
    }

    fn animation_channel(
        &mut self,
        ctx: &HookContext,
        channel: &Channel,
        bag: &mut Extensions,
    ) -> Result<()> {
        for hook in &mut self.hooks {
            hook.animation_channel(ctx, channel, bag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Tagger(&'static str);

    impl ExtensionHook for Tagger {
        fn node(&mut self, ctx: &HookContext, _node: &Node, bag: &mut Extensions) -> Result<()> {
            bag.insert(self.0.to_string(), json!({ "index": ctx.index }));
            Ok(())
        }
    }

    #[test]
    fn test_chain_runs_in_order() {
        let mut a = Tagger("EXT_a");
        let mut b = Tagger("EXT_b");
        let mut chain = HookChain::new().with(&mut a).with(&mut b);
        let mut bag = Extensions::new();
        chain
            .node(&HookContext::new(HookPhase::Import, 3), &Node::default(), &mut bag)
            .unwrap();
        let keys: Vec<_> = bag.keys().cloned().collect();
        assert_eq!(keys, vec!["EXT_a", "EXT_b"]);
        assert_eq!(bag["EXT_a"], json!({ "index": 3 }));
    }

    #[test]
    fn test_no_hooks_is_noop() {
        let mut bag = Extensions::new();
        NoHooks
            .material(
                &HookContext::new(HookPhase::Export, 0),
                &Material::default(),
                &mut bag,
            )
            .unwrap();
        assert!(bag.is_empty());
    }
}
