//! Scope chain for inheritable node attributes.
//!
//! While matching, every command, command type, and argument node the
//! matcher descends into contributes its [`NodeAttrs`] as a frame. Lookups
//! walk the frames nearest first; the active command type's attributes sit
//! below every frame as a replaceable defaults slot. The chain is a
//! persistent list, so each match branch extends its own view without
//! copying its parent's.

use sdnsh_grammar_tables::{NodeAttrs, ProcList, ProcRef};
use std::rc::Rc;

#[derive(Debug)]
struct Frame<'g> {
    attrs: &'g NodeAttrs,
    next: Option<Rc<Frame<'g>>>,
}

/// Ordered view of the attributes in effect at a node.
#[derive(Debug, Clone, Default)]
pub struct ScopeChain<'g> {
    head: Option<Rc<Frame<'g>>>,
    defaults: Option<&'g NodeAttrs>,
}

impl<'g> ScopeChain<'g> {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain with `attrs` as its nearest frame.
    #[must_use]
    pub fn push(&self, attrs: &'g NodeAttrs) -> Self {
        Self {
            head: Some(Rc::new(Frame {
                attrs,
                next: self.head.as_ref().map(Rc::clone),
            })),
            defaults: self.defaults,
        }
    }

    /// The same frames with a different command type's defaults underneath.
    #[must_use]
    pub fn with_defaults(&self, defaults: &'g NodeAttrs) -> Self {
        Self {
            head: self.head.as_ref().map(Rc::clone),
            defaults: Some(defaults),
        }
    }

    /// Frames nearest first, then the defaults.
    pub fn frames(&self) -> impl Iterator<Item = &'g NodeAttrs> + '_ {
        let mut next = self.head.as_deref();
        std::iter::from_fn(move || {
            let frame = next?;
            next = frame.next.as_deref();
            Some(frame.attrs)
        })
        .chain(self.defaults)
    }

    /// Number of frames, not counting the defaults.
    pub fn depth(&self) -> usize {
        self.frames().count() - usize::from(self.defaults.is_some())
    }

    /// First value `get` finds, nearest frame first.
    pub fn resolve<T: ?Sized>(&self, get: impl Fn(&'g NodeAttrs) -> Option<&'g T>) -> Option<&'g T> {
        self.frames().find_map(get)
    }

    /// The action for this form of the command (`noAction` for `no`).
    pub fn action(&self, is_no_command: bool) -> Option<&'g ProcList> {
        if is_no_command {
            self.resolve(|a| a.no_action.as_ref())
        } else {
            self.resolve(|a| a.action.as_ref())
        }
    }

    /// Object type in scope.
    pub fn obj_type(&self) -> Option<&'g str> {
        self.resolve(|a| a.obj_type.as_deref())
    }

    /// Completion procedure in scope.
    pub fn completion(&self) -> Option<&'g ProcRef> {
        self.resolve(|a| a.completion.as_ref())
    }

    /// Data handler in scope.
    pub fn data_handler(&self) -> Option<&'g ProcRef> {
        self.resolve(|a| a.data_handler.as_ref())
    }

    /// Exit hook in scope.
    pub fn on_exit(&self) -> Option<&'g ProcRef> {
        self.resolve(|a| a.on_exit.as_ref())
    }

    /// One-line help in scope.
    pub fn short_help(&self) -> Option<&'g str> {
        self.resolve(|a| a.short_help.as_deref())
    }

    /// General help in scope.
    pub fn all_help(&self) -> Option<&'g str> {
        self.resolve(|a| a.all_help.as_deref())
    }

    /// Pseudo-candidate help in scope.
    pub fn syntax_help(&self) -> Option<&'g str> {
        self.resolve(|a| a.syntax_help.as_deref())
    }

    /// Help name in scope.
    pub fn help_name(&self) -> Option<&'g str> {
        self.resolve(|a| a.help_name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(obj_type: Option<&str>, help: Option<&str>) -> NodeAttrs {
        NodeAttrs {
            obj_type: obj_type.map(String::from),
            short_help: help.map(String::from),
            ..NodeAttrs::default()
        }
    }

    #[test]
    fn nearest_frame_wins() {
        let outer = attrs(Some("switch"), Some("outer"));
        let inner = attrs(None, Some("inner"));
        let chain = ScopeChain::new().push(&outer).push(&inner);
        assert_eq!(chain.short_help(), Some("inner"));
        assert_eq!(chain.obj_type(), Some("switch"));
        assert_eq!(chain.depth(), 2);
    }

    #[test]
    fn branches_share_their_parent() {
        let root = attrs(Some("port"), None);
        let a = attrs(None, Some("a"));
        let b = attrs(None, Some("b"));
        let base = ScopeChain::new().push(&root);
        let left = base.push(&a);
        let right = base.push(&b);
        assert_eq!(left.short_help(), Some("a"));
        assert_eq!(right.short_help(), Some("b"));
        assert_eq!(base.short_help(), None);
        assert_eq!(left.obj_type(), right.obj_type());
    }

    #[test]
    fn defaults_sit_below_every_frame_and_can_be_replaced() {
        let config = NodeAttrs {
            action: Some(ProcList::One(ProcRef::Name("write-fields".into()))),
            no_action: Some(ProcList::One(ProcRef::Name("reset-fields".into()))),
            ..NodeAttrs::default()
        };
        let display = NodeAttrs {
            action: Some(ProcList::One(ProcRef::Name("display-table".into()))),
            ..NodeAttrs::default()
        };
        let node = attrs(Some("switch"), None);
        let chain = ScopeChain::new().with_defaults(&config).push(&node);
        assert_eq!(chain.action(false).unwrap().procs()[0].name(), "write-fields");
        assert_eq!(chain.action(true).unwrap().procs()[0].name(), "reset-fields");

        let replaced = chain.with_defaults(&display);
        assert_eq!(replaced.action(false).unwrap().procs()[0].name(), "display-table");
        assert!(replaced.action(true).is_none());
        assert_eq!(replaced.obj_type(), Some("switch"));
        assert_eq!(replaced.depth(), 1);
    }
}
