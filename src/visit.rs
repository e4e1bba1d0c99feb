//! Variant dispatch and depth-first traversal over the expression tree.
//!
//! [`dispatch`] maps a node (or its absence) to exactly one handler of an
//! [`ExprVisitor`]. Three ready-made policies cover the common cases:
//!
//! - the trait's default methods are all no-ops, so an implementation only
//!   overrides the handlers it cares about;
//! - [`VariantName`] records a stable name per variant, for diagnostics;
//! - [`Delegate`] adapts a plain closure into a full dispatch target,
//!   forwarding every present node and suppressing the absent case.
//!
//! [`DepthFirst`] layers pre-order traversal on top: the inner visitor sees
//! each node before its children, in a fixed per-variant child order. The
//! traversal is total — there is no early-exit signal; a selective inner
//! visitor simply ignores the nodes it does not want.

use crate::expr::{
    App, Assert, AttrSet, Binary, ConcatStrings, Expr, HasAttr, If, IndStrLit, Lambda, Let, List,
    Not, PathLit, Pos, Select, StrLit, Var, With,
};

/// One handler per node variant, plus handlers for "no node here" and for
/// variants a newer front end may add.
///
/// Every handler defaults to a no-op. The provided [`visit`](Self::visit)
/// entry point identifies the variant and invokes the matching handler; it is
/// also the seam a policy can override wholesale (see [`Delegate`]).
///
/// Dispatch never fails for a well-formed node: an unrecognized variant lands
/// in [`visit_unknown`](Self::visit_unknown) so that upstream additions
/// degrade gracefully instead of crashing callers.
pub trait ExprVisitor<'a> {
    /// Identify `node`'s variant and invoke exactly one handler.
    fn visit(&mut self, node: Option<&'a Expr>) {
        dispatch(self, node);
    }

    /// An absent node: a valid case of its own, not an error.
    fn visit_missing(&mut self) {}
    /// A variant this crate does not know about.
    fn visit_unknown(&mut self, _node: &'a Expr) {}

    fn visit_int(&mut self, _value: i64) {}
    fn visit_str(&mut self, _lit: &'a StrLit) {}
    fn visit_ind_str(&mut self, _lit: &'a IndStrLit) {}
    fn visit_path(&mut self, _lit: &'a PathLit) {}
    fn visit_var(&mut self, _var: &'a Var) {}
    fn visit_select(&mut self, _select: &'a Select) {}
    fn visit_has_attr(&mut self, _has: &'a HasAttr) {}
    fn visit_attrs(&mut self, _set: &'a AttrSet) {}
    fn visit_list(&mut self, _list: &'a List) {}
    fn visit_lambda(&mut self, _lambda: &'a Lambda) {}
    fn visit_let(&mut self, _let_in: &'a Let) {}
    fn visit_with(&mut self, _with: &'a With) {}
    fn visit_if(&mut self, _if_then: &'a If) {}
    fn visit_assert(&mut self, _assert: &'a Assert) {}
    fn visit_not(&mut self, _not: &'a Not) {}
    fn visit_app(&mut self, _app: &'a App) {}
    fn visit_eq(&mut self, _op: &'a Binary) {}
    fn visit_neq(&mut self, _op: &'a Binary) {}
    fn visit_and(&mut self, _op: &'a Binary) {}
    fn visit_or(&mut self, _op: &'a Binary) {}
    fn visit_implication(&mut self, _op: &'a Binary) {}
    fn visit_update(&mut self, _op: &'a Binary) {}
    fn visit_concat_lists(&mut self, _op: &'a Binary) {}
    fn visit_concat_strings(&mut self, _concat: &'a ConcatStrings) {}
    fn visit_cur_pos(&mut self, _pos: Pos) {}
}

/// Invoke exactly one handler of `visitor` for `node`.
pub fn dispatch<'a, V>(visitor: &mut V, node: Option<&'a Expr>)
where
    V: ExprVisitor<'a> + ?Sized,
{
    let Some(expr) = node else {
        return visitor.visit_missing();
    };

    match expr {
        Expr::Int(value) => visitor.visit_int(*value),
        Expr::Str(lit) => visitor.visit_str(lit),
        Expr::IndStr(lit) => visitor.visit_ind_str(lit),
        Expr::Path(lit) => visitor.visit_path(lit),
        Expr::Var(var) => visitor.visit_var(var),
        Expr::Select(select) => visitor.visit_select(select),
        Expr::HasAttr(has) => visitor.visit_has_attr(has),
        Expr::Attrs(set) => visitor.visit_attrs(set),
        Expr::List(list) => visitor.visit_list(list),
        Expr::Lambda(lambda) => visitor.visit_lambda(lambda),
        Expr::Let(let_in) => visitor.visit_let(let_in),
        Expr::With(with) => visitor.visit_with(with),
        Expr::If(if_then) => visitor.visit_if(if_then),
        Expr::Assert(assert) => visitor.visit_assert(assert),
        Expr::Not(not) => visitor.visit_not(not),
        Expr::App(app) => visitor.visit_app(app),
        Expr::Eq(op) => visitor.visit_eq(op),
        Expr::NEq(op) => visitor.visit_neq(op),
        Expr::And(op) => visitor.visit_and(op),
        Expr::Or(op) => visitor.visit_or(op),
        Expr::Impl(op) => visitor.visit_implication(op),
        Expr::Update(op) => visitor.visit_update(op),
        Expr::ConcatLists(op) => visitor.visit_concat_lists(op),
        Expr::ConcatStrings(concat) => visitor.visit_concat_strings(concat),
        Expr::CurPos(pos) => visitor.visit_cur_pos(*pos),
        // `Expr` is non_exhaustive: variants added by a newer front end land
        // here in downstream builds.
        #[allow(unreachable_patterns)]
        _ => visitor.visit_unknown(expr),
    }
}

/// Identifying policy: records a stable name for the dispatched variant,
/// including distinct names for the missing and unknown cases.
///
/// Meant for diagnostics and logging, never for control flow.
#[derive(Debug, Default)]
pub struct VariantName {
    pub name: &'static str,
}

impl<'a> ExprVisitor<'a> for VariantName {
    fn visit_missing(&mut self) {
        self.name = "missing";
    }
    fn visit_unknown(&mut self, _node: &'a Expr) {
        self.name = "unknown";
    }
    fn visit_int(&mut self, _value: i64) {
        self.name = "Int";
    }
    fn visit_str(&mut self, _lit: &'a StrLit) {
        self.name = "Str";
    }
    fn visit_ind_str(&mut self, _lit: &'a IndStrLit) {
        self.name = "IndStr";
    }
    fn visit_path(&mut self, _lit: &'a PathLit) {
        self.name = "Path";
    }
    fn visit_var(&mut self, _var: &'a Var) {
        self.name = "Var";
    }
    fn visit_select(&mut self, _select: &'a Select) {
        self.name = "Select";
    }
    fn visit_has_attr(&mut self, _has: &'a HasAttr) {
        self.name = "HasAttr";
    }
    fn visit_attrs(&mut self, _set: &'a AttrSet) {
        self.name = "Attrs";
    }
    fn visit_list(&mut self, _list: &'a List) {
        self.name = "List";
    }
    fn visit_lambda(&mut self, _lambda: &'a Lambda) {
        self.name = "Lambda";
    }
    fn visit_let(&mut self, _let_in: &'a Let) {
        self.name = "Let";
    }
    fn visit_with(&mut self, _with: &'a With) {
        self.name = "With";
    }
    fn visit_if(&mut self, _if_then: &'a If) {
        self.name = "If";
    }
    fn visit_assert(&mut self, _assert: &'a Assert) {
        self.name = "Assert";
    }
    fn visit_not(&mut self, _not: &'a Not) {
        self.name = "Not";
    }
    fn visit_app(&mut self, _app: &'a App) {
        self.name = "App";
    }
    fn visit_eq(&mut self, _op: &'a Binary) {
        self.name = "Eq";
    }
    fn visit_neq(&mut self, _op: &'a Binary) {
        self.name = "NEq";
    }
    fn visit_and(&mut self, _op: &'a Binary) {
        self.name = "And";
    }
    fn visit_or(&mut self, _op: &'a Binary) {
        self.name = "Or";
    }
    fn visit_implication(&mut self, _op: &'a Binary) {
        self.name = "Impl";
    }
    fn visit_update(&mut self, _op: &'a Binary) {
        self.name = "Update";
    }
    fn visit_concat_lists(&mut self, _op: &'a Binary) {
        self.name = "ConcatLists";
    }
    fn visit_concat_strings(&mut self, _concat: &'a ConcatStrings) {
        self.name = "ConcatStrings";
    }
    fn visit_cur_pos(&mut self, _pos: Pos) {
        self.name = "CurPos";
    }
}

/// Name of `node`'s variant ("missing" for an absent node).
pub fn variant_name(node: Option<&Expr>) -> &'static str {
    let mut id = VariantName::default();
    id.visit(node);
    id.name
}

/// Delegating policy: lets a plain closure act as a full dispatch target.
///
/// Every present node is forwarded to the callback as `&Expr`; the missing
/// case is suppressed — the callback is never invoked for an absent node.
pub struct Delegate<F>(pub F);

impl<'a, F> ExprVisitor<'a> for Delegate<F>
where
    F: FnMut(&'a Expr),
{
    fn visit(&mut self, node: Option<&'a Expr>) {
        if let Some(expr) = node {
            (self.0)(expr);
        }
    }
}

/// Pre-order depth-first walker.
///
/// For every node, the inner visitor runs first, then the walker recurses
/// into the children in a fixed order:
///
/// - `Select` → subject, default
/// - `HasAttr` → subject
/// - `Attrs` → static binding values in table order, then each dynamic
///   binding's name and value in declaration order
/// - `List` → elements in order
/// - `Lambda` → formal defaults in declaration order, then the body
/// - `Let` → body only; bound definitions are reached through the body's
///   uses, never walked directly
/// - `With` → scope, body
/// - `If` → condition, then branch, else branch
/// - `Assert` → condition, body
/// - `Not` → operand
/// - `App`, `Eq`, `NEq`, `And`, `Impl`, `Update`, `ConcatLists` → left
///   operand, right operand
/// - `Or` → none; `||` operands are not descended into here, a caller that
///   needs them hooks [`ExprVisitor::visit_or`] and recurses itself
/// - `ConcatStrings` → each part in order, nothing when the node carries no
///   part list
///
/// Atomic variants and the missing/unknown cases have no children.
pub struct DepthFirst<V> {
    inner: V,
}

impl<'a, V> DepthFirst<V>
where
    V: ExprVisitor<'a>,
{
    pub fn new(inner: V) -> Self {
        DepthFirst { inner }
    }

    pub fn into_inner(self) -> V {
        self.inner
    }

    /// Visit `node`, then its children.
    pub fn walk(&mut self, node: Option<&'a Expr>) {
        self.inner.visit(node);

        let Some(expr) = node else { return };
        match expr {
            Expr::Int(_)
            | Expr::Str(_)
            | Expr::IndStr(_)
            | Expr::Path(_)
            | Expr::Var(_)
            | Expr::CurPos(_) => {}

            Expr::Select(select) => {
                self.walk(Some(&select.subject));
                self.walk(select.default.as_deref());
            }
            Expr::HasAttr(has) => self.walk(Some(&has.subject)),
            Expr::Attrs(set) => {
                for attr in set.attrs.values() {
                    self.walk(Some(&attr.value));
                }
                for dynamic in &set.dynamic_attrs {
                    self.walk(Some(&dynamic.name));
                    self.walk(Some(&dynamic.value));
                }
            }
            Expr::List(list) => {
                for elem in &list.elems {
                    self.walk(Some(elem));
                }
            }
            Expr::Lambda(lambda) => {
                for formal in &lambda.formals {
                    self.walk(formal.default.as_ref());
                }
                self.walk(Some(&lambda.body));
            }
            Expr::Let(let_in) => self.walk(Some(&let_in.body)),
            Expr::With(with) => {
                self.walk(Some(&with.scope));
                self.walk(Some(&with.body));
            }
            Expr::If(if_then) => {
                self.walk(Some(&if_then.cond));
                self.walk(Some(&if_then.then_branch));
                self.walk(Some(&if_then.else_branch));
            }
            Expr::Assert(assert) => {
                self.walk(Some(&assert.cond));
                self.walk(Some(&assert.body));
            }
            Expr::Not(not) => self.walk(Some(&not.operand)),
            Expr::App(app) => {
                self.walk(Some(&app.func));
                self.walk(Some(&app.arg));
            }
            Expr::Eq(op)
            | Expr::NEq(op)
            | Expr::And(op)
            | Expr::Impl(op)
            | Expr::Update(op)
            | Expr::ConcatLists(op) => {
                self.walk(Some(&op.lhs));
                self.walk(Some(&op.rhs));
            }
            // Matches the upstream walker: `||` is visited but not entered.
            Expr::Or(_) => {}
            Expr::ConcatStrings(concat) => {
                if let Some(parts) = &concat.parts {
                    for part in parts {
                        self.walk(Some(part));
                    }
                }
            }
            // Unknown variants expose no children to walk.
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }
}
