//! User-expansion capability.
//!
//! Guard and action text travels through the pipeline untouched; just
//! before a fragment lands in the output, the [`Expander`] rewrites
//! user-visible identifier references into target-language accessors.
//! The emitter treats the returned strings as opaque C fragments and
//! invokes the expander at most once per guard/action index.

use crate::hsm::Behavior;
use crate::mangle::NameMangler;

/// Rewrites guard/action source text for the target language.
pub trait Expander {
    /// Expanded guard expression for `behavior`. Only called when the
    /// behavior carries non-blank guard text.
    fn expand_guard(&self, behavior: &Behavior) -> String;

    /// Expanded action body for `behavior`. May return an empty string
    /// for behaviors without action text.
    fn expand_action(&self, behavior: &Behavior) -> String;
}

/// Pass-through expander: emits guard/action text exactly as written.
///
/// Useful when the diagram already contains target-language fragments,
/// and as the test double everywhere in this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimExpander;

impl Expander for VerbatimExpander {
    fn expand_guard(&self, behavior: &Behavior) -> String {
        behavior.guard.clone().unwrap_or_default()
    }

    fn expand_action(&self, behavior: &Behavior) -> String {
        behavior.action.clone().unwrap_or_default()
    }
}

/// Expander that rewrites `$name` variable references into `Vars`
/// field accessors (`$speed` becomes `self->vars.speed`), mangling
/// each referenced name through [`NameMangler::var_name`].
///
/// A `$` not followed by an identifier, or a reference the mangler
/// rejects, is left untouched; everything else in the fragment passes
/// through verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldAccessExpander<M> {
    mangler: M,
}

impl<M: NameMangler> FieldAccessExpander<M> {
    #[must_use]
    pub fn new(mangler: M) -> Self {
        FieldAccessExpander { mangler }
    }

    fn rewrite(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 16);
        let mut rest = text;
        while let Some(dollar) = rest.find('$') {
            out.push_str(&rest[..dollar]);
            let after = &rest[dollar + 1..];
            let end = after
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(after.len());
            let name = &after[..end];
            match self.mangler.var_name(name) {
                Ok(mangled) if !name.is_empty() => {
                    out.push_str("self->vars.");
                    out.push_str(&mangled);
                }
                _ => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            rest = &after[end..];
        }
        out.push_str(rest);
        out
    }
}

impl<M: NameMangler> Expander for FieldAccessExpander<M> {
    fn expand_guard(&self, behavior: &Behavior) -> String {
        self.rewrite(behavior.guard.as_deref().unwrap_or_default())
    }

    fn expand_action(&self, behavior: &Behavior) -> String {
        self.rewrite(behavior.action.as_deref().unwrap_or_default())
    }
}
