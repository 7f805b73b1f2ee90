use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::value::AttrValue;

/// A storage path addressing an attribute, a nested attribute, or a map
/// entry: one segment per level, joined with `.` in rendered expressions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// A root-level attribute path.
    pub fn root(segment: impl Into<String>) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    /// Extend the path by one segment (nested attribute or map entry key).
    #[must_use]
    pub fn child(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// The path's segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(seg)?;
        }
        Ok(())
    }
}

/// Comparison operator for server-evaluated conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl ComparisonOperator {
    /// Expression symbol for rendering.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Evaluate a comparison between an actual stored value and an expected one.
///
/// Values of incomparable kinds satisfy only `Ne`.
#[must_use]
pub fn evaluate_comparison(
    op: ComparisonOperator,
    actual: &AttrValue,
    expected: &AttrValue,
) -> bool {
    use core::cmp::Ordering;
    match op {
        ComparisonOperator::Eq => actual == expected,
        ComparisonOperator::Ne => actual != expected,
        _ => match actual.compare(expected) {
            Some(ord) => match op {
                ComparisonOperator::Lt => ord == Ordering::Less,
                ComparisonOperator::Le => ord != Ordering::Greater,
                ComparisonOperator::Gt => ord == Ordering::Greater,
                ComparisonOperator::Ge => ord != Ordering::Less,
                ComparisonOperator::Eq | ComparisonOperator::Ne => unreachable!(),
            },
            None => false,
        },
    }
}

/// A caller-declared server-side condition, before placeholder encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Compare the value at `path` against `value`.
    Compare {
        /// Attribute path.
        path: Path,
        /// Comparison operator.
        op: ComparisonOperator,
        /// Expected value.
        value: AttrValue,
    },
    /// The attribute at `path` must exist.
    Exists(Path),
    /// The attribute at `path` must not exist.
    NotExists(Path),
}

/// A path encoded through the name-placeholder table (`#n` tokens).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRef {
    tokens: Vec<String>,
}

impl PathRef {
    /// The placeholder tokens, outermost first.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl fmt::Display for PathRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(t)?;
        }
        Ok(())
    }
}

/// A value encoded through the value-placeholder table (`:v` token).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRef {
    token: String,
}

impl ValueRef {
    /// The placeholder token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// `path = value` assignment clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetClause {
    path: PathRef,
    value: ValueRef,
}

impl SetClause {
    /// Target path.
    #[must_use]
    pub fn path(&self) -> &PathRef {
        &self.path
    }

    /// Assigned value reference.
    #[must_use]
    pub fn value(&self) -> &ValueRef {
        &self.value
    }
}

/// `path += value` clause: numeric add or set union, applied server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddClause {
    path: PathRef,
    value: ValueRef,
}

impl AddClause {
    /// Target path.
    #[must_use]
    pub fn path(&self) -> &PathRef {
        &self.path
    }

    /// Delta value reference.
    #[must_use]
    pub fn value(&self) -> &ValueRef {
        &self.value
    }
}

/// `path = list_append(path, value)` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendClause {
    path: PathRef,
    value: ValueRef,
}

impl AppendClause {
    /// Target path.
    #[must_use]
    pub fn path(&self) -> &PathRef {
        &self.path
    }

    /// Appended list reference.
    #[must_use]
    pub fn value(&self) -> &ValueRef {
        &self.value
    }
}

/// A condition encoded through the placeholder tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionClause {
    /// Compare the stored value against an expected value.
    Compare {
        /// Attribute path.
        path: PathRef,
        /// Comparison operator.
        op: ComparisonOperator,
        /// Expected value reference.
        value: ValueRef,
    },
    /// The attribute must exist.
    Exists(PathRef),
    /// The attribute must not exist.
    NotExists(PathRef),
}

/// The normalized output of one update build: four clause collections plus
/// AND-combined conditions, all indirected through placeholder tables so
/// attribute names never collide with the store's reserved syntax.
///
/// # Example
///
/// ```
/// use recmap::{AttrValue, ExpressionBuilder, Path};
///
/// let mut builder = ExpressionBuilder::new();
/// builder.push_set(&Path::root("alias"), AttrValue::from("new"));
/// builder.push_add(&Path::root("counter"), AttrValue::from(1i64));
/// let expr = builder.build();
///
/// assert_eq!(expr.update_expression(), "SET #n0 = :v0 ADD #n1 :v1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct UpdateExpression {
    names: BTreeMap<String, String>,
    values: BTreeMap<String, AttrValue>,
    set: Vec<SetClause>,
    remove: Vec<PathRef>,
    add: Vec<AddClause>,
    append: Vec<AppendClause>,
    conditions: Vec<ConditionClause>,
}

impl UpdateExpression {
    /// Name placeholder table (`#n` token → storage attribute name).
    #[must_use]
    pub fn names(&self) -> &BTreeMap<String, String> {
        &self.names
    }

    /// Value placeholder table (`:v` token → value).
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, AttrValue> {
        &self.values
    }

    /// SET clauses.
    #[must_use]
    pub fn set(&self) -> &[SetClause] {
        &self.set
    }

    /// REMOVE paths.
    #[must_use]
    pub fn remove(&self) -> &[PathRef] {
        &self.remove
    }

    /// ADD clauses.
    #[must_use]
    pub fn add(&self) -> &[AddClause] {
        &self.add
    }

    /// List-append clauses.
    #[must_use]
    pub fn append(&self) -> &[AppendClause] {
        &self.append
    }

    /// AND-combined conditions.
    #[must_use]
    pub fn conditions(&self) -> &[ConditionClause] {
        &self.conditions
    }

    /// True when no clause of any kind is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.remove.is_empty()
            && self.add.is_empty()
            && self.append.is_empty()
    }

    /// Resolve a path reference to actual storage segments.
    #[must_use]
    pub fn resolve_path(&self, path: &PathRef) -> Vec<&str> {
        path.tokens()
            .iter()
            .map(|t| self.names[t].as_str())
            .collect()
    }

    /// Resolve a value reference.
    #[must_use]
    pub fn resolve_value(&self, value: &ValueRef) -> &AttrValue {
        &self.values[value.token()]
    }

    /// Render the update expression text.
    #[must_use]
    pub fn update_expression(&self) -> String {
        let mut out = String::new();
        if !self.set.is_empty() || !self.append.is_empty() {
            out.push_str("SET ");
            let mut parts: Vec<String> = self
                .set
                .iter()
                .map(|c| format!("{} = {}", c.path, c.value.token))
                .collect();
            parts.extend(self.append.iter().map(|c| {
                format!("{} = list_append({}, {})", c.path, c.path, c.value.token)
            }));
            out.push_str(&parts.join(", "));
        }
        if !self.remove.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str("REMOVE ");
            let parts: Vec<String> = self.remove.iter().map(|p| format!("{p}")).collect();
            out.push_str(&parts.join(", "));
        }
        if !self.add.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str("ADD ");
            let parts: Vec<String> = self
                .add
                .iter()
                .map(|c| format!("{} {}", c.path, c.value.token))
                .collect();
            out.push_str(&parts.join(", "));
        }
        out
    }

    /// Render the condition expression text, if any condition was declared.
    #[must_use]
    pub fn condition_expression(&self) -> Option<String> {
        render_conditions(&self.conditions)
    }
}

/// A standalone AND-combined condition set, used for conditional full puts.
#[derive(Debug, Clone, Default)]
pub struct ConditionExpression {
    names: BTreeMap<String, String>,
    values: BTreeMap<String, AttrValue>,
    conditions: Vec<ConditionClause>,
}

impl ConditionExpression {
    /// Encode a list of conditions into a standalone expression.
    #[must_use]
    pub fn from_conditions(conditions: &[Condition]) -> Self {
        let mut builder = ExpressionBuilder::new();
        for cond in conditions {
            builder.push_condition(cond.clone());
        }
        let expr = builder.build();
        Self {
            names: expr.names,
            values: expr.values,
            conditions: expr.conditions,
        }
    }

    /// The encoded conditions.
    #[must_use]
    pub fn conditions(&self) -> &[ConditionClause] {
        &self.conditions
    }

    /// True when no condition is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Resolve a path reference to actual storage segments.
    #[must_use]
    pub fn resolve_path(&self, path: &PathRef) -> Vec<&str> {
        path.tokens()
            .iter()
            .map(|t| self.names[t].as_str())
            .collect()
    }

    /// Resolve a value reference.
    #[must_use]
    pub fn resolve_value(&self, value: &ValueRef) -> &AttrValue {
        &self.values[value.token()]
    }

    /// Render the condition expression text.
    #[must_use]
    pub fn condition_expression(&self) -> Option<String> {
        render_conditions(&self.conditions)
    }
}

fn render_conditions(conditions: &[ConditionClause]) -> Option<String> {
    if conditions.is_empty() {
        return None;
    }
    let parts: Vec<String> = conditions
        .iter()
        .map(|c| match c {
            ConditionClause::Compare { path, op, value } => {
                format!("{} {} {}", path, op.symbol(), value.token)
            }
            ConditionClause::Exists(path) => format!("attribute_exists({path})"),
            ConditionClause::NotExists(path) => {
                format!("attribute_not_exists({path})")
            }
        })
        .collect();
    Some(parts.join(" AND "))
}

/// Accumulates clauses and conditions, assigning placeholder tokens, and
/// finalizes into an [`UpdateExpression`].
///
/// Attribute names are deduplicated: the same segment always maps to the
/// same `#n` token within one expression.
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    names: BTreeMap<String, String>,
    tokens_by_name: BTreeMap<String, String>,
    values: BTreeMap<String, AttrValue>,
    set: Vec<SetClause>,
    remove: Vec<PathRef>,
    add: Vec<AddClause>,
    append: Vec<AppendClause>,
    conditions: Vec<ConditionClause>,
}

impl ExpressionBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn name_token(&mut self, segment: &str) -> String {
        if let Some(token) = self.tokens_by_name.get(segment) {
            return token.clone();
        }
        let token = format!("#n{}", self.names.len());
        self.names.insert(token.clone(), String::from(segment));
        self.tokens_by_name
            .insert(String::from(segment), token.clone());
        token
    }

    fn value_token(&mut self, value: AttrValue) -> ValueRef {
        let token = format!(":v{}", self.values.len());
        self.values.insert(token.clone(), value);
        ValueRef { token }
    }

    fn path_ref(&mut self, path: &Path) -> PathRef {
        let tokens = path
            .segments()
            .iter()
            .map(|s| self.name_token(s))
            .collect();
        PathRef { tokens }
    }

    /// Add a SET clause.
    pub fn push_set(&mut self, path: &Path, value: AttrValue) {
        let path = self.path_ref(path);
        let value = self.value_token(value);
        self.set.push(SetClause { path, value });
    }

    /// Add a REMOVE clause.
    pub fn push_remove(&mut self, path: &Path) {
        let path = self.path_ref(path);
        self.remove.push(path);
    }

    /// Add an ADD clause (numeric add or set union).
    pub fn push_add(&mut self, path: &Path, value: AttrValue) {
        let path = self.path_ref(path);
        let value = self.value_token(value);
        self.add.push(AddClause { path, value });
    }

    /// Add a list-append clause.
    pub fn push_append(&mut self, path: &Path, values: Vec<AttrValue>) {
        let path = self.path_ref(path);
        let value = self.value_token(AttrValue::List(values));
        self.append.push(AppendClause { path, value });
    }

    /// Add a condition.
    pub fn push_condition(&mut self, condition: Condition) {
        let clause = match condition {
            Condition::Compare { path, op, value } => {
                let path = self.path_ref(&path);
                let value = self.value_token(value);
                ConditionClause::Compare { path, op, value }
            }
            Condition::Exists(path) => ConditionClause::Exists(self.path_ref(&path)),
            Condition::NotExists(path) => ConditionClause::NotExists(self.path_ref(&path)),
        };
        self.conditions.push(clause);
    }

    /// Finalize into an immutable expression.
    #[must_use]
    pub fn build(self) -> UpdateExpression {
        UpdateExpression {
            names: self.names,
            values: self.values,
            set: self.set,
            remove: self.remove,
            add: self.add,
            append: self.append,
            conditions: self.conditions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn renders_all_clause_kinds() {
        let mut b = ExpressionBuilder::new();
        b.push_set(&Path::root("alias"), AttrValue::from("x"));
        b.push_remove(&Path::root("bio"));
        b.push_add(&Path::root("balance").child("gold"), AttrValue::from(5i64));
        b.push_append(&Path::root("log"), vec![AttrValue::from("entry")]);
        let expr = b.build();
        assert_eq!(
            expr.update_expression(),
            "SET #n0 = :v0, #n4 = list_append(#n4, :v2) REMOVE #n1 ADD #n2.#n3 :v1"
        );
    }

    #[test]
    fn dedupes_name_tokens() {
        let mut b = ExpressionBuilder::new();
        b.push_set(&Path::root("m").child("a"), AttrValue::from(1i64));
        b.push_add(&Path::root("m").child("b"), AttrValue::from(2i64));
        let expr = b.build();
        // "m" appears in both paths but gets one token.
        assert_eq!(expr.names().len(), 3);
    }

    #[test]
    fn resolves_paths_and_values() {
        let mut b = ExpressionBuilder::new();
        b.push_set(&Path::root("st").child("bio"), AttrValue::from("hi"));
        let expr = b.build();
        let clause = &expr.set()[0];
        assert_eq!(expr.resolve_path(clause.path()), vec!["st", "bio"]);
        assert_eq!(expr.resolve_value(clause.value()), &AttrValue::from("hi"));
    }

    #[test]
    fn renders_conditions() {
        let mut b = ExpressionBuilder::new();
        b.push_condition(Condition::Compare {
            path: Path::root("ml").child("dollars"),
            op: ComparisonOperator::Lt,
            value: AttrValue::from(2i64),
        });
        b.push_condition(Condition::NotExists(Path::root("id")));
        let expr = b.build();
        assert_eq!(
            expr.condition_expression().unwrap(),
            "#n0.#n1 < :v0 AND attribute_not_exists(#n2)"
        );
    }

    #[test]
    fn standalone_condition_expression() {
        let expr = ConditionExpression::from_conditions(&[Condition::Exists(Path::root("id"))]);
        assert_eq!(
            expr.condition_expression().unwrap(),
            "attribute_exists(#n0)"
        );
        assert!(!expr.is_empty());
    }

    #[test]
    fn comparison_evaluation() {
        let two = AttrValue::from(2i64);
        let three = AttrValue::from(3i64);
        assert!(evaluate_comparison(ComparisonOperator::Lt, &two, &three));
        assert!(!evaluate_comparison(ComparisonOperator::Gt, &two, &three));
        assert!(evaluate_comparison(ComparisonOperator::Ne, &two, &three));
        // Incomparable kinds satisfy only Ne.
        let s = AttrValue::from("2");
        assert!(!evaluate_comparison(ComparisonOperator::Lt, &s, &three));
        assert!(evaluate_comparison(ComparisonOperator::Ne, &s, &three));
    }

    #[test]
    fn path_display() {
        assert_eq!(Path::root("a").child("b").child("c").to_string(), "a.b.c");
    }

    #[test]
    fn empty_expression() {
        let expr = ExpressionBuilder::new().build();
        assert!(expr.is_empty());
        assert_eq!(expr.update_expression(), "");
        assert!(expr.condition_expression().is_none());
    }
}
