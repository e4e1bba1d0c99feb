//! Locating calls to a named function whose record argument binds specific
//! string-valued fields.
//!
//! Everything here probes: a node that does not fit the shape is a normal
//! negative result (`None`), never an error, so a caller can keep scanning.

use crate::expr::{App, Expr, Pos, StrLit};
use crate::patch::Replacement;
use crate::visit::{Delegate, DepthFirst};
use tracing::trace;

/// A plain string literal together with its derived source position.
///
/// Literal nodes carry no position of their own. The position here is the
/// binding's position shifted right by `len(name) + 3` columns (one space,
/// the equals sign, one space), which assumes the literal starts on the
/// binding's line with exactly that spacing. The patcher's verification step
/// catches the cases where the assumption does not hold; values spanning
/// several lines or padded differently around `=` are unsupported inputs.
#[derive(Debug, Clone, Copy)]
pub struct StringAndPos<'a> {
    pub lit: &'a StrLit,
    pub pos: Pos,
}

impl<'a> StringAndPos<'a> {
    pub fn value(&self) -> &'a str {
        &self.lit.value
    }

    /// The literal as it appears in the source, quotes included.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.lit.value)
    }

    /// Plan a substitution of this literal with `new_value`, both sides
    /// quoted.
    pub fn replacement(&self, new_value: &str) -> Replacement {
        Replacement {
            line: self.pos.line,
            column: self.pos.column,
            old_text: self.quoted(),
            new_text: format!("\"{new_value}\""),
        }
    }
}

/// A function application matched by [`match_call`], with each requested
/// field's literal and derived position.
#[derive(Debug, Clone)]
pub struct MatchedCall<'a> {
    pub app: &'a App,
    pub fields: Vec<MatchedField<'a>>,
}

#[derive(Debug, Clone)]
pub struct MatchedField<'a> {
    pub name: String,
    pub string: StringAndPos<'a>,
}

impl<'a> MatchedCall<'a> {
    pub fn field(&self, name: &str) -> Option<&StringAndPos<'a>> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.string)
    }
}

/// Is `expr` an application of the bare variable `name`?
///
/// Select-expression call targets (`pkgs.fetchgit { ... }`) are not
/// recognized.
pub fn as_named_call<'a>(expr: &'a Expr, name: &str) -> Option<&'a App> {
    let Expr::App(app) = expr else { return None };
    let Expr::Var(var) = app.func.as_ref() else {
        return None;
    };
    (var.name == name).then_some(app)
}

/// Look up a statically bound field of the application's record argument
/// whose value is a plain, non-interpolated string literal.
///
/// Dynamically named bindings are never matched.
pub fn string_attr<'a>(app: &'a App, name: &str) -> Option<StringAndPos<'a>> {
    let Expr::Attrs(set) = app.arg.as_ref() else {
        return None;
    };
    let attr = set.attrs.get(name)?;
    let Expr::Str(lit) = &attr.value else {
        return None;
    };

    let pos = Pos {
        line: attr.pos.line,
        column: attr.pos.column + name.len() as u32 + 3,
    };
    Some(StringAndPos { lit, pos })
}

/// Probe `expr` for a call to `function` whose record argument statically
/// binds every name in `fields` to a plain string literal.
///
/// Any missing piece makes the whole match fail; there is no partial result.
pub fn match_call<'a>(
    expr: &'a Expr,
    function: &str,
    fields: &[&str],
) -> Option<MatchedCall<'a>> {
    let app = as_named_call(expr, function)?;

    let mut matched = Vec::with_capacity(fields.len());
    for &name in fields {
        let string = string_attr(app, name)?;
        matched.push(MatchedField {
            name: name.to_string(),
            string,
        });
    }

    Some(MatchedCall {
        app,
        fields: matched,
    })
}

/// Collect every [`match_call`] hit under `root`, in document (pre-order)
/// order.
pub fn find_calls<'a>(root: &'a Expr, function: &str, fields: &[&str]) -> Vec<MatchedCall<'a>> {
    let mut found = Vec::new();
    let mut walker = DepthFirst::new(Delegate(|expr: &'a Expr| {
        if let Some(matched) = match_call(expr, function, fields) {
            trace!(function, pos = %matched.app.pos, "matched call");
            found.push(matched);
        }
    }));
    walker.walk(Some(root));
    drop(walker);
    found
}
