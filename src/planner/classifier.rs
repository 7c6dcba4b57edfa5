//! Expression classification and rewriting
//!
//! Walks a bound query tree and produces its [`NormalForm`]: a flat list of
//! native filters, the ancestor constraint, sorts and the result shape.
//! Disjunctions and IN lists collapse into a single IN filter per property;
//! branch expansion happens later. Anything that cannot be expressed is
//! rejected with the layer responsible for the limitation.

use chrono::{DateTime, Utc};

use super::ast::{BoolOperator, Expr, Operator, PropertyPath, QueryTree, StatementKind};
use super::errors::{QueryError, QueryResult};
use super::like::prefix_range;
use super::native::{FilterOperator, FilterPredicate, SortPredicate};
use super::params::Parameters;
use super::rules::{self, FunctionRule, Target, Translation, UnaryRule};
use crate::datastore::StoreCapabilities;
use crate::mapping::{EntityMeta, ResolvedProperty, KEY_PROPERTY};
use crate::value::{to_ancestor_key, to_key, to_native, Key, KeyFormat, NativeValue, QueryValue, ValueKind};

/// Where a projected value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// The entity key, rendered in the mapped key format
    Key(KeyFormat),
    /// The parent of the entity key
    Ancestor,
    /// A stored property
    Property { name: String, kind: ValueKind },
}

/// One column of a projection result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedField {
    pub label: String,
    pub source: FieldSource,
}

/// Classified form of one bound query
#[derive(Debug, Clone, PartialEq)]
pub struct NormalForm {
    pub kind: String,
    pub ancestor: Option<Key>,
    /// Conjunctive filters; IN filters are not yet exploded
    pub filters: Vec<FilterPredicate>,
    pub sorts: Vec<SortPredicate>,
    pub fields: Vec<ProjectedField>,
    pub count: bool,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    /// Some conjunct can never match
    pub unsatisfiable: bool,
}

impl NormalForm {
    fn new(kind: &str, tree: &QueryTree) -> Self {
        Self {
            kind: kind.to_string(),
            ancestor: None,
            filters: Vec::new(),
            sorts: Vec::new(),
            fields: Vec::new(),
            count: false,
            offset: tree.offset,
            limit: tree.limit,
            unsatisfiable: false,
        }
    }
}

enum Operand<'e> {
    Property(&'e PropertyPath),
    Value(QueryValue),
}

fn target_of(resolved: &ResolvedProperty) -> Target {
    match resolved {
        ResolvedProperty::PrimaryKey { .. } => Target::PrimaryKey,
        ResolvedProperty::Ancestor => Target::Ancestor,
        ResolvedProperty::Column { .. } => Target::Column,
        ResolvedProperty::ChildRelation { .. } => Target::ChildRelation,
        ResolvedProperty::ParentRelation { .. } => Target::ParentRelation,
    }
}

fn flatten_or<'e>(children: &'e [Expr], out: &mut Vec<&'e Expr>) {
    for child in children {
        match child {
            Expr::Bool {
                op: BoolOperator::Or,
                children,
            } => flatten_or(children, out),
            other => out.push(other),
        }
    }
}

fn flatten_values(values: Vec<QueryValue>) -> Vec<QueryValue> {
    let mut flat = Vec::with_capacity(values.len());
    for value in values {
        match value {
            QueryValue::List(items) => flat.extend(flatten_values(items)),
            other => flat.push(other),
        }
    }
    flat
}

fn push_unique(values: &mut Vec<NativeValue>, value: NativeValue) {
    if !values.iter().any(|v| v.same_as(&value)) {
        values.push(value);
    }
}

/// Classifies a query tree against bound parameters
pub struct Classifier<'a> {
    entity: &'a EntityMeta,
    tree: &'a QueryTree,
    params: &'a Parameters,
    now: DateTime<Utc>,
    capabilities: StoreCapabilities,
    form: NormalForm,
    like_seen: bool,
}

impl<'a> Classifier<'a> {
    pub fn new(
        entity: &'a EntityMeta,
        tree: &'a QueryTree,
        params: &'a Parameters,
        now: DateTime<Utc>,
        capabilities: StoreCapabilities,
    ) -> Self {
        Self {
            entity,
            tree,
            params,
            now,
            capabilities,
            form: NormalForm::new(&entity.kind, tree),
            like_seen: false,
        }
    }

    pub fn classify(mut self) -> QueryResult<NormalForm> {
        let tree = self.tree;

        check_grouping(tree)?;
        self.classify_result()?;
        if let Some(filter) = &tree.filter {
            self.classify_conjunct(filter)?;
        }
        self.classify_ordering()?;

        Ok(self.form)
    }

    fn alias(&self) -> Option<&'a str> {
        self.tree.alias.as_deref()
    }

    fn resolve(&self, path: &PropertyPath) -> QueryResult<ResolvedProperty> {
        resolve_path(self.entity, self.alias(), path)
    }

    fn push(&mut self, property: &str, operator: FilterOperator, value: NativeValue) {
        self.form
            .filters
            .push(FilterPredicate::new(property, operator, value));
    }

    // ==================================================================
    // Result clause and ordering
    // ==================================================================

    fn classify_result(&mut self) -> QueryResult<()> {
        let tree = self.tree;
        for expr in &tree.result {
            match expr {
                Expr::Property(path) if path.is_alias(self.alias()) => {}
                Expr::Property(path) => {
                    let field = self.projected_field(path)?;
                    self.form.fields.push(field);
                }
                Expr::Function { name, args } => {
                    check_count(self.entity, self.alias(), name, args)?;
                    self.form.count = true;
                }
                other => return Err(unsupported_result(other)),
            }
        }
        Ok(())
    }

    fn projected_field(&self, path: &PropertyPath) -> QueryResult<ProjectedField> {
        let source = match self.resolve(path)? {
            ResolvedProperty::PrimaryKey { format } => FieldSource::Key(format),
            ResolvedProperty::Ancestor => FieldSource::Ancestor,
            ResolvedProperty::Column { name, kind } => FieldSource::Property { name, kind },
            ResolvedProperty::ChildRelation { .. } | ResolvedProperty::ParentRelation { .. } => {
                return Err(QueryError::unsupported_by_orm(format!(
                    "Projecting relation '{}' is not supported",
                    path
                ))
                .with_property(path.to_string()))
            }
        };
        Ok(ProjectedField {
            label: path.to_string(),
            source,
        })
    }

    fn classify_ordering(&mut self) -> QueryResult<()> {
        let tree = self.tree;
        for order in &tree.ordering {
            let property = sort_property(self.entity, self.alias(), &order.expr)?;
            self.form.sorts.push(SortPredicate {
                property,
                direction: order.direction,
            });
        }
        Ok(())
    }

    // ==================================================================
    // Filters
    // ==================================================================

    fn classify_conjunct(&mut self, expr: &Expr) -> QueryResult<()> {
        match expr {
            Expr::Bool {
                op: BoolOperator::And,
                children,
            } => {
                for child in children {
                    self.classify_conjunct(child)?;
                }
                Ok(())
            }
            Expr::Bool {
                op: BoolOperator::Or,
                children,
            } => self.classify_disjunction(children),
            Expr::Binary { op, left, right } => self.classify_comparison(*op, left, right),
            Expr::In { operand, values } => self.classify_in(operand, values),
            Expr::MemberOf {
                element,
                collection,
            } => self.classify_member_of(element, collection),
            Expr::Like {
                operand,
                pattern,
                escape,
            } => self.classify_like(operand, pattern, escape.is_some()),
            Expr::IsNull { operand, negated } => self.classify_is_null(operand, *negated),
            Expr::Unary { op, .. } => Err(QueryError::unsupported_operator(op.token())),
            Expr::Function { name, .. } => Err(QueryError::unsupported_function(name)),
            Expr::Property(_) | Expr::Literal(_) | Expr::Parameter(_) => Err(
                QueryError::malformed("Filter terms must be boolean expressions"),
            ),
        }
    }

    fn operand<'e>(&self, expr: &'e Expr) -> QueryResult<Operand<'e>> {
        match expr {
            Expr::Property(path) => Ok(Operand::Property(path)),
            Expr::Literal(value) => Ok(Operand::Value(value.clone())),
            Expr::Parameter(param) => self
                .params
                .get(param)
                .cloned()
                .map(Operand::Value)
                .ok_or_else(|| QueryError::unbound_parameter(param)),
            Expr::Function { name, args } => match rules::function_rule(name) {
                FunctionRule::CurrentTime if args.is_empty() => {
                    Ok(Operand::Value(QueryValue::Date(self.now)))
                }
                _ => Err(QueryError::unsupported_function(name)),
            },
            Expr::Unary { op, operand } => match (rules::unary_rule(*op), operand.as_ref()) {
                (UnaryRule::FoldNegative, Expr::Literal(QueryValue::Int(i))) => i
                    .checked_neg()
                    .map(|n| Operand::Value(QueryValue::Int(n)))
                    .ok_or_else(|| QueryError::malformed(format!("Literal -{} overflows", i))),
                (UnaryRule::FoldNegative, Expr::Literal(QueryValue::Double(d))) => {
                    Ok(Operand::Value(QueryValue::Double(-d)))
                }
                _ => Err(QueryError::unsupported_operator(op.token())),
            },
            Expr::Binary { op, .. } if op.is_comparison() => Err(QueryError::malformed(format!(
                "Comparison '{}' cannot be used as a value",
                op.token()
            ))),
            Expr::Binary { op, .. } => Err(QueryError::unsupported_operator(op.token())),
            _ => Err(QueryError::malformed(
                "Boolean expression cannot be used as a value",
            )),
        }
    }

    /// Normalizes a comparison to `(property, operator, value)`.
    fn property_and_value<'e>(
        &self,
        op: Operator,
        left: &'e Expr,
        right: &'e Expr,
    ) -> QueryResult<(&'e PropertyPath, Operator, QueryValue)> {
        match (self.operand(left)?, self.operand(right)?) {
            (Operand::Property(path), Operand::Value(value)) => Ok((path, op, value)),
            (Operand::Value(value), Operand::Property(path)) => Ok((path, op.mirrored(), value)),
            (Operand::Property(path), Operand::Property(_)) => Err(
                QueryError::unsupported_by_datastore("Comparing two properties is not supported")
                    .with_operator(op.token())
                    .with_property(path.to_string()),
            ),
            (Operand::Value(_), Operand::Value(_)) => Err(QueryError::malformed(format!(
                "Comparison '{}' must reference a property",
                op.token()
            ))),
        }
    }

    fn classify_comparison(&mut self, op: Operator, left: &Expr, right: &Expr) -> QueryResult<()> {
        rules::check_operator(op)?;
        let (path, op, value) = self.property_and_value(op, left, right)?;
        let resolved = self.resolve(path)?;

        if let QueryValue::List(items) = value {
            if op == Operator::Eq {
                return self.membership(path, resolved, items);
            }
            return Err(QueryError::unsupported_by_orm(format!(
                "A collection value can only be compared with '=' or IN, not '{}'",
                op.token()
            ))
            .with_operator(op.token())
            .with_property(path.to_string()));
        }

        let translation = rules::comparison_rule(op, target_of(&resolved), &self.capabilities)
            .map_err(|e| e.with_property(path.to_string()))?;

        match (translation, resolved) {
            (Translation::Filter(filter_op), ResolvedProperty::Column { name, kind }) => {
                let native = coerce(&value, &kind, path)?;
                self.push(&name, filter_op, native);
                Ok(())
            }
            (Translation::KeyFilter(filter_op), ResolvedProperty::PrimaryKey { format }) => {
                let key = self.primary_key(&value, format, path)?;
                self.push(KEY_PROPERTY, filter_op, NativeValue::Key(key));
                Ok(())
            }
            (Translation::Ancestor, _) => {
                if value.is_null() {
                    return Err(null_ancestor(path));
                }
                let key = to_ancestor_key(&value).map_err(|e| QueryError::coercion(&e, path.to_string()))?;
                self.set_ancestor(key, path)
            }
            (Translation::ChildKey, ResolvedProperty::ChildRelation { kind }) => {
                self.child_equality(&kind, &value, path)
            }
            (Translation::ParentAncestor, ResolvedProperty::ParentRelation { kind }) => {
                let key = self.relation_key(&kind, &value, path)?;
                self.set_ancestor(key, path)
            }
            _ => Err(QueryError::malformed(format!(
                "Property '{}' cannot be compared with '{}'",
                path,
                op.token()
            ))),
        }
    }

    fn primary_key(&self, value: &QueryValue, format: KeyFormat, path: &PropertyPath) -> QueryResult<Key> {
        if value.is_null() {
            return Err(QueryError::unsupported_by_orm("Primary keys are never null")
                .with_property(path.to_string()));
        }
        to_key(value, &self.entity.kind, format).map_err(|e| QueryError::coercion(&e, path.to_string()))
    }

    fn set_ancestor(&mut self, key: Key, path: &PropertyPath) -> QueryResult<()> {
        match &self.form.ancestor {
            Some(existing) if *existing != key => Err(QueryError::unsupported_by_datastore(
                "A query may have only one ancestor",
            )
            .with_property(path.to_string())),
            _ => {
                self.form.ancestor = Some(key);
                Ok(())
            }
        }
    }

    /// Key of a relation operand, checked against the relation's kind.
    fn relation_key(&self, kind: &str, value: &QueryValue, path: &PropertyPath) -> QueryResult<Key> {
        if value.is_null() {
            return Err(null_relation(path));
        }
        if let QueryValue::Object(obj) = value {
            if obj.kind != kind {
                return Err(QueryError::unsupported_by_orm(format!(
                    "Object of kind '{}' cannot be compared with relation '{}' of kind '{}'",
                    obj.kind, path, kind
                ))
                .with_property(path.to_string()));
            }
            if obj.key.is_none() {
                return Err(QueryError::unsupported_by_orm(format!(
                    "Object compared with relation '{}' has no key",
                    path
                ))
                .with_property(path.to_string()));
            }
        }

        let key = to_ancestor_key(value).map_err(|e| QueryError::coercion(&e, path.to_string()))?;
        if key.kind() != kind {
            return Err(QueryError::unsupported_by_orm(format!(
                "Key of kind '{}' cannot be compared with relation '{}' of kind '{}'",
                key.kind(),
                path,
                kind
            ))
            .with_property(path.to_string()));
        }
        Ok(key)
    }

    /// `child = :c` selects the entity owning `c`: a key equality on c's parent.
    fn child_equality(&mut self, kind: &str, value: &QueryValue, path: &PropertyPath) -> QueryResult<()> {
        let key = self.relation_key(kind, value, path)?;
        let parent = key.parent().ok_or_else(|| {
            QueryError::unsupported_by_orm(format!(
                "Object compared with relation '{}' has no parent, so its ancestor cannot match",
                path
            ))
            .with_property(path.to_string())
        })?;

        if parent.kind() != self.entity.kind {
            self.form.unsatisfiable = true;
            return Ok(());
        }
        self.push(KEY_PROPERTY, FilterOperator::Eq, NativeValue::Key(parent));
        Ok(())
    }

    /// Adds one equality or IN filter for a set of candidate values.
    fn membership(
        &mut self,
        path: &PropertyPath,
        resolved: ResolvedProperty,
        values: Vec<QueryValue>,
    ) -> QueryResult<()> {
        let values = flatten_values(values);
        if values.is_empty() {
            return Err(QueryError::unsupported_by_orm(format!(
                "IN on '{}' requires at least one value",
                path
            ))
            .with_operator("IN")
            .with_property(path.to_string()));
        }

        let (property, natives) = match resolved {
            ResolvedProperty::Column { name, kind } => {
                let mut natives = Vec::new();
                for value in &values {
                    push_unique(&mut natives, coerce(value, &kind, path)?);
                }
                (name, natives)
            }
            ResolvedProperty::PrimaryKey { format } => {
                let mut natives = Vec::new();
                for value in &values {
                    push_unique(&mut natives, NativeValue::Key(self.primary_key(value, format, path)?));
                }
                (KEY_PROPERTY.to_string(), natives)
            }
            other => {
                return Err(QueryError::unsupported_by_datastore(format!(
                    "IN and OR are not supported on {} '{}'",
                    describe(&other),
                    path
                ))
                .with_operator("IN")
                .with_property(path.to_string()))
            }
        };

        match <[NativeValue; 1]>::try_from(natives) {
            Ok([single]) => self.push(&property, FilterOperator::Eq, single),
            Err(natives) => self.push(&property, FilterOperator::In, NativeValue::List(natives)),
        }
        Ok(())
    }

    fn classify_disjunction(&mut self, children: &[Expr]) -> QueryResult<()> {
        let mut leaves = Vec::new();
        flatten_or(children, &mut leaves);

        let mut target: Option<(&PropertyPath, ResolvedProperty)> = None;
        let mut values = Vec::new();

        for leaf in leaves {
            let (path, leaf_values) = self.disjunct(leaf)?;
            let resolved = self.resolve(path)?;
            match &target {
                None => target = Some((path, resolved)),
                Some((first, existing)) if *existing != resolved => {
                    return Err(QueryError::unsupported_by_datastore(format!(
                        "OR is only supported between filters on the same property, found '{}' and '{}'",
                        first, path
                    ))
                    .with_operator("OR")
                    .with_property(path.to_string()))
                }
                Some(_) => {}
            }
            values.extend(leaf_values);
        }

        match target {
            Some((path, resolved)) => self.membership(path, resolved, values),
            None => Ok(()),
        }
    }

    /// One leaf of an OR: an equality-like term on a single property.
    fn disjunct<'e>(&self, leaf: &'e Expr) -> QueryResult<(&'e PropertyPath, Vec<QueryValue>)> {
        let not_equality = |token: &str| {
            QueryError::unsupported_by_datastore(format!(
                "OR is only supported between equality filters, found '{}'",
                token
            ))
            .with_operator(token)
        };

        match leaf {
            Expr::Binary { op, left, right } => {
                rules::check_operator(*op)?;
                if *op != Operator::Eq {
                    return Err(not_equality(op.token()));
                }
                let (path, _, value) = self.property_and_value(*op, left, right)?;
                Ok((path, vec![value]))
            }
            Expr::MemberOf {
                element,
                collection,
            } => {
                let (path, _, value) = self.property_and_value(Operator::Eq, element, collection)?;
                Ok((path, vec![value]))
            }
            Expr::In { operand, values } => {
                let path = self.property_operand(operand, "IN")?;
                Ok((path, self.value_list(values)?))
            }
            Expr::IsNull {
                operand,
                negated: false,
            } => Ok((self.property_operand(operand, "IS NULL")?, vec![QueryValue::Null])),
            Expr::IsNull { negated: true, .. } => Err(not_equality("IS NOT NULL")),
            Expr::Like { .. } => Err(not_equality("LIKE")),
            Expr::Bool {
                op: BoolOperator::And,
                ..
            } => Err(QueryError::unsupported_by_datastore(
                "OR of AND expressions is not supported",
            )
            .with_operator("AND")),
            Expr::Unary { op, .. } => Err(QueryError::unsupported_operator(op.token())),
            Expr::Function { name, .. } => Err(QueryError::unsupported_function(name)),
            _ => Err(QueryError::malformed("OR terms must be boolean expressions")),
        }
    }

    fn property_operand<'e>(&self, expr: &'e Expr, context: &str) -> QueryResult<&'e PropertyPath> {
        match self.operand(expr)? {
            Operand::Property(path) => Ok(path),
            Operand::Value(_) => Err(QueryError::malformed(format!(
                "{} requires a property on its left side",
                context
            ))),
        }
    }

    fn value_list(&self, exprs: &[Expr]) -> QueryResult<Vec<QueryValue>> {
        exprs
            .iter()
            .map(|e| match self.operand(e)? {
                Operand::Value(v) => Ok(v),
                Operand::Property(path) => Err(QueryError::unsupported_by_datastore(
                    "IN lists may only contain values",
                )
                .with_property(path.to_string())),
            })
            .collect()
    }

    fn classify_in(&mut self, operand: &Expr, values: &[Expr]) -> QueryResult<()> {
        let path = self.property_operand(operand, "IN")?;
        let values = self.value_list(values)?;
        let resolved = self.resolve(path)?;
        self.membership(path, resolved, values)
    }

    fn classify_member_of(&mut self, element: &Expr, collection: &Expr) -> QueryResult<()> {
        let (path, _, value) = self.property_and_value(Operator::Eq, element, collection)?;
        let resolved = self.resolve(path)?;
        self.membership(path, resolved, vec![value])
    }

    fn classify_like(&mut self, operand: &Expr, pattern: &Expr, has_escape: bool) -> QueryResult<()> {
        if has_escape {
            return Err(QueryError::unsupported_by_datastore("LIKE with ESCAPE is not supported")
                .with_operator("ESCAPE"));
        }
        if self.like_seen {
            return Err(QueryError::unsupported_by_datastore(
                "Only one LIKE filter is supported per query",
            )
            .with_operator("LIKE"));
        }
        self.like_seen = true;

        let path = self.property_operand(operand, "LIKE")?;
        let text = match self.operand(pattern)? {
            Operand::Value(QueryValue::String(text)) => text,
            Operand::Value(other) => {
                return Err(QueryError::unsupported_by_orm(format!(
                    "LIKE pattern must be a string, found {}",
                    other.type_name()
                ))
                .with_operator("LIKE")
                .with_property(path.to_string()))
            }
            Operand::Property(_) => {
                return Err(QueryError::unsupported_by_datastore(
                    "LIKE pattern must be a value, not a property",
                )
                .with_operator("LIKE")
                .with_property(path.to_string()))
            }
        };

        let range = prefix_range(&text).ok_or_else(|| {
            QueryError::unsupported_by_datastore(format!(
                "LIKE pattern '{}' is not supported; only a prefix followed by a single '%' is",
                text
            ))
            .with_operator("LIKE")
            .with_property(path.to_string())
        })?;

        match self.resolve(path)? {
            ResolvedProperty::Column { name, .. } => {
                self.push(&name, FilterOperator::Gte, NativeValue::String(range.lower));
                self.push(&name, FilterOperator::Lt, NativeValue::String(range.upper));
                Ok(())
            }
            other => Err(QueryError::unsupported_by_datastore(format!(
                "LIKE is not supported on {} '{}'",
                describe(&other),
                path
            ))
            .with_operator("LIKE")
            .with_property(path.to_string())),
        }
    }

    fn classify_is_null(&mut self, operand: &Expr, negated: bool) -> QueryResult<()> {
        let path = self.property_operand(operand, "IS NULL")?;
        match self.resolve(path)? {
            ResolvedProperty::Column { name, .. } => {
                let op = if negated { Operator::Ne } else { Operator::Eq };
                match rules::comparison_rule(op, Target::Column, &self.capabilities)
                    .map_err(|e| e.with_property(path.to_string()))?
                {
                    Translation::Filter(filter_op) => {
                        self.push(&name, filter_op, NativeValue::Null);
                        Ok(())
                    }
                    _ => Err(QueryError::malformed(format!("Cannot test '{}' for null", path))),
                }
            }
            ResolvedProperty::ChildRelation { .. } | ResolvedProperty::ParentRelation { .. } => {
                Err(null_relation(path))
            }
            ResolvedProperty::Ancestor => Err(null_ancestor(path)),
            ResolvedProperty::PrimaryKey { .. } => Err(QueryError::unsupported_by_orm(
                "Primary keys are never null",
            )
            .with_property(path.to_string())),
        }
    }
}

fn describe(resolved: &ResolvedProperty) -> &'static str {
    match resolved {
        ResolvedProperty::PrimaryKey { .. } => "primary key",
        ResolvedProperty::Ancestor => "ancestor property",
        ResolvedProperty::Column { .. } => "property",
        ResolvedProperty::ChildRelation { .. } => "child relation",
        ResolvedProperty::ParentRelation { .. } => "parent relation",
    }
}

fn coerce(value: &QueryValue, kind: &ValueKind, path: &PropertyPath) -> QueryResult<NativeValue> {
    to_native(value, kind).map_err(|e| QueryError::coercion(&e, path.to_string()))
}

fn null_ancestor(path: &PropertyPath) -> QueryError {
    QueryError::unsupported_by_datastore("Ancestor value cannot be null").with_property(path.to_string())
}

fn null_relation(path: &PropertyPath) -> QueryError {
    QueryError::unsupported_by_datastore(format!(
        "Null comparison on relation '{}' is not supported",
        path
    ))
    .with_property(path.to_string())
}

fn unsupported_result(expr: &Expr) -> QueryError {
    match expr {
        Expr::Binary { op, .. } => QueryError::unsupported_operator(op.token()),
        Expr::Unary { op, .. } => QueryError::unsupported_operator(op.token()),
        _ => QueryError::malformed("Result expressions must be properties or COUNT"),
    }
}

fn resolve_path(
    entity: &EntityMeta,
    alias: Option<&str>,
    path: &PropertyPath,
) -> QueryResult<ResolvedProperty> {
    entity
        .resolve(path.without_alias(alias))
        .map_err(|e| QueryError::unknown_property(&e, path.to_string()))
}

fn check_grouping(tree: &QueryTree) -> QueryResult<()> {
    if !tree.grouping.is_empty() {
        return Err(QueryError::unsupported_by_orm("GROUP BY is not supported").with_operator("GROUP BY"));
    }
    if tree.having.is_some() {
        return Err(QueryError::unsupported_by_orm("HAVING is not supported").with_operator("HAVING"));
    }
    Ok(())
}

fn check_count(entity: &EntityMeta, alias: Option<&str>, name: &str, args: &[Expr]) -> QueryResult<()> {
    if rules::function_rule(name) != FunctionRule::Count {
        return Err(QueryError::unsupported_function(name));
    }
    match args {
        [] => Ok(()),
        [Expr::Property(path)] if path.is_alias(alias) => Ok(()),
        [Expr::Property(path)] => resolve_path(entity, alias, path).map(|_| ()),
        _ => Err(QueryError::malformed(
            "COUNT takes the candidate alias or a single property",
        )),
    }
}

fn sort_property(entity: &EntityMeta, alias: Option<&str>, expr: &Expr) -> QueryResult<String> {
    match expr {
        Expr::Property(path) => match resolve_path(entity, alias, path)? {
            ResolvedProperty::PrimaryKey { .. } => Ok(KEY_PROPERTY.to_string()),
            ResolvedProperty::Column { name, .. } => Ok(name),
            other => Err(QueryError::unsupported_by_datastore(format!(
                "Sorting by {} '{}' is not supported",
                describe(&other),
                path
            ))
            .with_property(path.to_string())),
        },
        Expr::Function { name, .. } => Err(QueryError::unsupported_function(name)),
        Expr::Binary { op, .. } => Err(QueryError::unsupported_operator(op.token())),
        Expr::Unary { op, .. } => Err(QueryError::unsupported_operator(op.token())),
        _ => Err(QueryError::malformed("ORDER BY requires a property")),
    }
}

/// Checks everything that does not depend on parameter values.
///
/// Run once when a query is prepared, so structurally unsupported queries
/// fail before any parameters are bound.
pub fn check_structure(entity: &EntityMeta, tree: &QueryTree) -> QueryResult<()> {
    if tree.statement != StatementKind::Select {
        let token = tree.statement.token();
        return Err(QueryError::unsupported_by_orm(format!(
            "{} statements are not supported; only SELECT queries are translated",
            token
        ))
        .with_operator(token));
    }

    let alias = tree.alias.as_deref();
    check_grouping(tree)?;
    for expr in &tree.result {
        match expr {
            Expr::Property(path) if path.is_alias(alias) => {}
            Expr::Property(path) => {
                resolve_path(entity, alias, path)?;
            }
            Expr::Function { name, args } => check_count(entity, alias, name, args)?,
            other => return Err(unsupported_result(other)),
        }
    }
    if let Some(filter) = &tree.filter {
        check_expr(entity, alias, filter)?;
    }
    for order in &tree.ordering {
        sort_property(entity, alias, &order.expr)?;
    }
    Ok(())
}

fn check_expr(entity: &EntityMeta, alias: Option<&str>, expr: &Expr) -> QueryResult<()> {
    let check = |e: &Expr| check_expr(entity, alias, e);
    match expr {
        Expr::Property(path) => resolve_path(entity, alias, path).map(|_| ()),
        Expr::Literal(_) | Expr::Parameter(_) => Ok(()),
        Expr::Binary { op, left, right } => {
            rules::check_operator(*op)?;
            check(left)?;
            check(right)
        }
        Expr::Bool { children, .. } => children.iter().try_for_each(check),
        Expr::In { operand, values } => {
            check(operand)?;
            values.iter().try_for_each(check)
        }
        Expr::MemberOf {
            element,
            collection,
        } => {
            check(element)?;
            check(collection)
        }
        Expr::Like {
            operand, escape, ..
        } => {
            if escape.is_some() {
                return Err(QueryError::unsupported_by_datastore("LIKE with ESCAPE is not supported")
                    .with_operator("ESCAPE"));
            }
            check(operand)
        }
        Expr::IsNull { operand, .. } => check(operand),
        Expr::Unary { op, operand } => match (rules::unary_rule(*op), operand.as_ref()) {
            (UnaryRule::FoldNegative, Expr::Literal(QueryValue::Int(_)))
            | (UnaryRule::FoldNegative, Expr::Literal(QueryValue::Double(_))) => Ok(()),
            _ => Err(QueryError::unsupported_operator(op.token())),
        },
        Expr::Function { name, args } => match rules::function_rule(name) {
            FunctionRule::CurrentTime if args.is_empty() => Ok(()),
            _ => Err(QueryError::unsupported_function(name)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{FieldMeta, FieldType};
    use crate::planner::{QueryErrorCode, SortDirection};
    use crate::value::{KeyId, ObjectRef};
    use chrono::TimeZone;

    fn book_meta() -> EntityMeta {
        EntityMeta::new("Book", "Book", "id")
            .with_ancestor("shelfKey")
            .with_field(FieldMeta::new("title", FieldType::String))
            .with_field(FieldMeta::new("author", FieldType::String))
            .with_field(FieldMeta::new("isbn", FieldType::Int))
            .with_field(FieldMeta::new(
                "genre",
                FieldType::Enum {
                    enum_type: "Genre".into(),
                },
            ))
            .with_field(FieldMeta::new("tags", FieldType::String))
            .with_field(FieldMeta::new(
                "chapter",
                FieldType::ChildRelation {
                    kind: "Chapter".into(),
                },
            ))
            .with_field(FieldMeta::new(
                "shelf",
                FieldType::ParentRelation {
                    kind: "Shelf".into(),
                },
            ))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn classify_with(tree: &QueryTree, params: &Parameters, caps: StoreCapabilities) -> QueryResult<NormalForm> {
        let meta = book_meta();
        Classifier::new(&meta, tree, params, now(), caps).classify()
    }

    fn classify(tree: &QueryTree, params: &Parameters) -> QueryResult<NormalForm> {
        classify_with(tree, params, StoreCapabilities::default())
    }

    fn filtered(filter: Expr) -> QueryTree {
        QueryTree::new("Book").filter(filter)
    }

    fn code(result: QueryResult<NormalForm>) -> QueryErrorCode {
        result.unwrap_err().code()
    }

    #[test]
    fn test_single_equality() {
        let tree = filtered(Expr::prop("title").eq(Expr::lit("yar")));
        let form = classify(&tree, &Parameters::new()).unwrap();

        assert_eq!(form.kind, "Book");
        assert_eq!(
            form.filters,
            vec![FilterPredicate::new("title", FilterOperator::Eq, "yar".into())]
        );
        assert!(form.ancestor.is_none());
        assert!(!form.unsatisfiable);
    }

    #[test]
    fn test_operand_order_normalized() {
        let tree = filtered(Expr::param("p").lt(Expr::prop("isbn")));
        let params = Parameters::new().with_named("p", 5i64);
        let form = classify(&tree, &params).unwrap();
        assert_eq!(
            form.filters,
            vec![FilterPredicate::new("isbn", FilterOperator::Gt, NativeValue::Int(5))]
        );
    }

    #[test]
    fn test_alias_prefixed_paths() {
        let tree = QueryTree::new("Book")
            .with_alias("b")
            .filter(Expr::prop("b.title").eq(Expr::lit("yar")));
        let form = classify(&tree, &Parameters::new()).unwrap();
        assert_eq!(form.filters[0].property, "title");
    }

    #[test]
    fn test_or_and_in_canonicalize_identically() {
        let or_tree = filtered(Expr::or(vec![
            Expr::prop("title").eq(Expr::lit("a")),
            Expr::prop("title").eq(Expr::lit("b")),
        ]));
        let in_tree = filtered(Expr::prop("title").in_list(vec![Expr::lit("a"), Expr::lit("b")]));

        let or_form = classify(&or_tree, &Parameters::new()).unwrap();
        let in_form = classify(&in_tree, &Parameters::new()).unwrap();
        assert_eq!(or_form.filters, in_form.filters);
        assert_eq!(or_form.filters[0].operator, FilterOperator::In);
    }

    #[test]
    fn test_in_deduplicates_and_single_value_becomes_equality() {
        let tree = filtered(Expr::prop("title").in_list(vec![Expr::lit("a"), Expr::lit("a")]));
        let form = classify(&tree, &Parameters::new()).unwrap();
        assert_eq!(
            form.filters,
            vec![FilterPredicate::new("title", FilterOperator::Eq, "a".into())]
        );
    }

    #[test]
    fn test_mixed_type_or_keeps_distinct_values() {
        // (title = '2' OR title = 2) AND isbn = 4
        let tree = filtered(Expr::and(vec![
            Expr::or(vec![
                Expr::prop("title").eq(Expr::lit("2")),
                Expr::prop("title").eq(Expr::lit(2i64)),
            ]),
            Expr::prop("isbn").eq(Expr::lit(4i64)),
        ]));
        let form = classify(&tree, &Parameters::new()).unwrap();
        assert_eq!(form.filters.len(), 2);
        assert_eq!(
            form.filters[0].value,
            NativeValue::List(vec!["2".into(), NativeValue::Int(2)])
        );
    }

    #[test]
    fn test_or_with_null_leaf() {
        let tree = filtered(Expr::or(vec![
            Expr::prop("title").is_null(),
            Expr::prop("title").eq(Expr::lit("yar1")),
        ]));
        let form = classify(&tree, &Parameters::new()).unwrap();
        assert_eq!(
            form.filters[0].value,
            NativeValue::List(vec![NativeValue::Null, "yar1".into()])
        );
    }

    #[test]
    fn test_collection_parameters() {
        let tree = filtered(Expr::or(vec![
            Expr::prop("author").in_list(vec![Expr::param("p1")]),
            Expr::prop("author").in_list(vec![Expr::param("p2")]),
        ]));
        let params = Parameters::new()
            .with_named("p1", QueryValue::List(vec!["a".into(), "b".into()]))
            .with_named("p2", "c");
        let form = classify(&tree, &params).unwrap();
        assert_eq!(
            form.filters[0].value,
            NativeValue::List(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn test_equality_with_collection_is_in() {
        let tree = filtered(Expr::prop("title").eq(Expr::param("titles")));
        let params =
            Parameters::new().with_named("titles", QueryValue::List(vec!["x".into(), "y".into()]));
        let form = classify(&tree, &params).unwrap();
        assert_eq!(form.filters[0].operator, FilterOperator::In);

        let tree = filtered(Expr::prop("title").gt(Expr::param("titles")));
        assert_eq!(code(classify(&tree, &params)), QueryErrorCode::UnsupportedByOrm);
    }

    #[test]
    fn test_empty_in_is_orm_error() {
        let tree = filtered(Expr::prop("title").eq(Expr::param("titles")));
        let params = Parameters::new().with_named("titles", QueryValue::List(vec![]));
        assert_eq!(code(classify(&tree, &params)), QueryErrorCode::UnsupportedByOrm);

        let tree = filtered(Expr::prop("id").eq(Expr::param("titles")));
        assert_eq!(code(classify(&tree, &params)), QueryErrorCode::UnsupportedByOrm);
    }

    #[test]
    fn test_or_rejections() {
        let across = filtered(Expr::or(vec![
            Expr::prop("title").eq(Expr::lit("yar")),
            Expr::prop("author").is_null(),
        ]));
        assert_eq!(code(classify(&across, &Parameters::new())), QueryErrorCode::UnsupportedByDatastore);

        let inequalities = filtered(Expr::or(vec![
            Expr::prop("title").gt(Expr::lit(5i64)),
            Expr::prop("title").lt(Expr::lit(2i64)),
        ]));
        assert_eq!(
            code(classify(&inequalities, &Parameters::new())),
            QueryErrorCode::UnsupportedByDatastore
        );

        let nested_and = filtered(Expr::or(vec![
            Expr::and(vec![Expr::prop("title").eq(Expr::lit("a"))]),
            Expr::prop("title").eq(Expr::lit("b")),
        ]));
        assert_eq!(
            code(classify(&nested_and, &Parameters::new())),
            QueryErrorCode::UnsupportedByDatastore
        );
    }

    #[test]
    fn test_orm_unsupported_operators() {
        let arithmetic = filtered(
            Expr::binary(Operator::Add, Expr::prop("title"), Expr::prop("author")).eq(Expr::lit("foo")),
        );
        let err = classify(&arithmetic, &Parameters::new()).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::UnsupportedByOrm);
        assert_eq!(err.operator(), Some("+"));

        let not = filtered(Expr::not(Expr::prop("title").eq(Expr::lit("x"))));
        let err = classify(&not, &Parameters::new()).unwrap_err();
        assert_eq!(err.operator(), Some("NOT"));

        let grouped = QueryTree::new("Book").group_by(Expr::prop("title"));
        assert_eq!(code(classify(&grouped, &Parameters::new())), QueryErrorCode::UnsupportedByOrm);

        let avg = QueryTree::new("Book").select(Expr::function("avg", vec![Expr::prop("isbn")]));
        let err = classify(&avg, &Parameters::new()).unwrap_err();
        assert_eq!(err.operator(), Some("avg"));
    }

    #[test]
    fn test_negative_literal_folded() {
        let tree = filtered(Expr::prop("isbn").gt(Expr::neg(Expr::lit(5i64))));
        let form = classify(&tree, &Parameters::new()).unwrap();
        assert_eq!(form.filters[0].value, NativeValue::Int(-5));

        let tree = filtered(Expr::prop("isbn").gt(Expr::neg(Expr::param("p"))));
        let params = Parameters::new().with_named("p", 5i64);
        assert_eq!(code(classify(&tree, &params)), QueryErrorCode::UnsupportedByOrm);
    }

    #[test]
    fn test_like_prefix_rewrite() {
        let tree = filtered(Expr::prop("title").like(Expr::lit("yar%")));
        let form = classify(&tree, &Parameters::new()).unwrap();
        assert_eq!(
            form.filters,
            vec![
                FilterPredicate::new("title", FilterOperator::Gte, "yar".into()),
                FilterPredicate::new("title", FilterOperator::Lt, "yas".into()),
            ]
        );
    }

    #[test]
    fn test_like_rejections() {
        for pattern in ["%foo", "y%y", "y"] {
            let tree = filtered(Expr::prop("title").like(Expr::lit(pattern)));
            assert_eq!(
                code(classify(&tree, &Parameters::new())),
                QueryErrorCode::UnsupportedByDatastore,
                "pattern {}",
                pattern
            );
        }

        let two = filtered(Expr::and(vec![
            Expr::prop("title").like(Expr::lit("a%")),
            Expr::prop("author").like(Expr::lit("b%")),
        ]));
        assert_eq!(code(classify(&two, &Parameters::new())), QueryErrorCode::UnsupportedByDatastore);

        let escaped = filtered(Expr::prop("title").like_escape(Expr::lit("a%"), Expr::lit("\\")));
        assert_eq!(code(classify(&escaped, &Parameters::new())), QueryErrorCode::UnsupportedByDatastore);

        let numeric = filtered(Expr::prop("title").like(Expr::param("p")));
        let params = Parameters::new().with_named("p", 4i64);
        assert_eq!(code(classify(&numeric, &params)), QueryErrorCode::UnsupportedByOrm);
    }

    #[test]
    fn test_null_forms_are_equivalent() {
        let is_not_null = filtered(Expr::prop("title").is_not_null());
        let ne_null = filtered(Expr::prop("title").ne(Expr::lit(QueryValue::Null)));
        let ne_param = filtered(Expr::prop("title").ne(Expr::param("p")));
        let params = Parameters::new().with_named("p", QueryValue::Null);

        let expected = vec![FilterPredicate::new("title", FilterOperator::Ne, NativeValue::Null)];
        assert_eq!(classify(&is_not_null, &params).unwrap().filters, expected);
        assert_eq!(classify(&ne_null, &params).unwrap().filters, expected);
        assert_eq!(classify(&ne_param, &params).unwrap().filters, expected);

        let is_null = filtered(Expr::prop("title").is_null());
        assert_eq!(
            classify(&is_null, &params).unwrap().filters,
            vec![FilterPredicate::new("title", FilterOperator::Eq, NativeValue::Null)]
        );
    }

    #[test]
    fn test_not_equal_requires_capability() {
        let tree = filtered(Expr::prop("title").ne(Expr::lit("x")));
        let caps = StoreCapabilities {
            native_not_equal: false,
            native_in: false,
        };
        assert_eq!(
            code(classify_with(&tree, &Parameters::new(), caps)),
            QueryErrorCode::UnsupportedByDatastore
        );
    }

    #[test]
    fn test_enum_and_temporal_values() {
        let tree = filtered(Expr::and(vec![
            Expr::prop("genre").eq(Expr::lit(QueryValue::enum_value("Genre", "FICTION"))),
            Expr::prop("title").lt(Expr::function("CURRENT_TIMESTAMP", vec![])),
        ]));
        let form = classify(&tree, &Parameters::new()).unwrap();
        assert_eq!(form.filters[0].value, NativeValue::String("FICTION".into()));
        assert_eq!(form.filters[1].value, NativeValue::Date(now()));
    }

    #[test]
    fn test_ancestor_constraint() {
        let shelf = Key::with_name("Shelf", "s1");
        let tree = filtered(Expr::prop("shelfKey").eq(Expr::param("p")));
        let params = Parameters::new().with_named("p", shelf.encode());
        let form = classify(&tree, &params).unwrap();
        assert_eq!(form.ancestor, Some(shelf));
        assert!(form.filters.is_empty());

        let tree = filtered(Expr::prop("shelfKey").gt(Expr::param("p")));
        assert_eq!(code(classify(&tree, &params)), QueryErrorCode::UnsupportedByDatastore);

        let null = Parameters::new().with_named("p", QueryValue::Null);
        let tree = filtered(Expr::prop("shelfKey").eq(Expr::param("p")));
        assert_eq!(code(classify(&tree, &null)), QueryErrorCode::UnsupportedByDatastore);
    }

    #[test]
    fn test_parent_relation_sets_ancestor() {
        let shelf = Key::with_name("Shelf", "s1");
        let tree = filtered(Expr::prop("shelf").eq(Expr::param("s")));
        let params =
            Parameters::new().with_named("s", ObjectRef::new("Shelf", Some(shelf.clone())));
        assert_eq!(classify(&tree, &params).unwrap().ancestor, Some(shelf));

        let wrong = Parameters::new().with_named("s", Key::with_name("Library", "l"));
        assert_eq!(code(classify(&tree, &wrong)), QueryErrorCode::UnsupportedByOrm);

        let null_tree = filtered(Expr::prop("shelf").is_null());
        assert_eq!(
            code(classify(&null_tree, &Parameters::new())),
            QueryErrorCode::UnsupportedByDatastore
        );
    }

    #[test]
    fn test_child_relation_equality() {
        let book_key = Key::with_id("Book", 10);
        let chapter = book_key.child("Chapter", KeyId::Id(1));
        let tree = filtered(Expr::prop("chapter").eq(Expr::param("c")));

        let params = Parameters::new().with_named("c", ObjectRef::new("Chapter", Some(chapter)));
        let form = classify(&tree, &params).unwrap();
        assert_eq!(
            form.filters,
            vec![FilterPredicate::new(KEY_PROPERTY, FilterOperator::Eq, NativeValue::Key(book_key))]
        );

        // No identity
        let transient = Parameters::new().with_named("c", ObjectRef::new("Chapter", None));
        assert_eq!(code(classify(&tree, &transient)), QueryErrorCode::UnsupportedByOrm);

        // Key of the wrong kind
        let wrong_kind = Parameters::new().with_named("c", Key::with_id("Book", 1));
        assert_eq!(code(classify(&tree, &wrong_kind)), QueryErrorCode::UnsupportedByOrm);

        // No parent
        let orphan = Parameters::new().with_named("c", Key::with_id("Chapter", 1));
        assert_eq!(code(classify(&tree, &orphan)), QueryErrorCode::UnsupportedByOrm);

        // Parent of another kind can never match
        let foreign = Parameters::new().with_named(
            "c",
            Key::with_id("Magazine", 1).child("Chapter", KeyId::Id(1)),
        );
        let form = classify(&tree, &foreign).unwrap();
        assert!(form.unsatisfiable);

        let ranged = filtered(Expr::prop("chapter").gt(Expr::param("c")));
        assert_eq!(code(classify(&ranged, &params)), QueryErrorCode::UnsupportedByDatastore);
    }

    #[test]
    fn test_primary_key_filters() {
        let key = Key::with_id("Book", 1);
        let tree = filtered(Expr::prop("id").eq(Expr::param("k")));
        let params = Parameters::new().with_named("k", key.clone());
        let form = classify(&tree, &params).unwrap();
        assert_eq!(
            form.filters,
            vec![FilterPredicate::new(KEY_PROPERTY, FilterOperator::Eq, NativeValue::Key(key.clone()))]
        );

        let tree = filtered(Expr::prop("id").gt(Expr::param("k")));
        let form = classify(&tree, &params).unwrap();
        assert_eq!(form.filters[0].operator, FilterOperator::Gt);
    }

    #[test]
    fn test_unknown_properties_are_malformed() {
        let tree = filtered(Expr::prop("nope").eq(Expr::lit(1i64)));
        let err = classify(&tree, &Parameters::new()).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::MalformedQuery);
        assert_eq!(err.property(), Some("nope"));

        let sort = QueryTree::new("Book").order_by(Expr::prop("nope"), SortDirection::Asc);
        assert_eq!(code(classify(&sort, &Parameters::new())), QueryErrorCode::MalformedQuery);

        let projection = QueryTree::new("Book").select(Expr::prop("nope"));
        assert_eq!(code(classify(&projection, &Parameters::new())), QueryErrorCode::MalformedQuery);

        let count = QueryTree::new("Book").select(Expr::function("count", vec![Expr::prop("nope")]));
        assert_eq!(code(classify(&count, &Parameters::new())), QueryErrorCode::MalformedQuery);
    }

    #[test]
    fn test_unbound_parameter() {
        let tree = filtered(Expr::prop("title").eq(Expr::positional(1)));
        assert_eq!(code(classify(&tree, &Parameters::new())), QueryErrorCode::MalformedQuery);

        let params = Parameters::new().with_positional(1, "yar");
        assert!(classify(&tree, &params).is_ok());
    }

    #[test]
    fn test_result_and_ordering() {
        let tree = QueryTree::new("Book")
            .with_alias("b")
            .select(Expr::prop("b.title"))
            .select(Expr::prop("b.id"))
            .order_by(Expr::prop("id"), SortDirection::Desc);
        let form = classify(&tree, &Parameters::new()).unwrap();

        assert_eq!(form.fields.len(), 2);
        assert_eq!(form.fields[1].source, FieldSource::Key(KeyFormat::Key));
        assert_eq!(form.sorts, vec![SortPredicate::desc(KEY_PROPERTY)]);

        let count = QueryTree::new("Book")
            .with_alias("b")
            .select(Expr::function("COUNT", vec![Expr::prop("b")]));
        assert!(classify(&count, &Parameters::new()).unwrap().count);
    }

    #[test]
    fn test_structure_check() {
        let meta = book_meta();
        let ok = filtered(Expr::prop("title").eq(Expr::param("t")));
        assert!(check_structure(&meta, &ok).is_ok());

        let arithmetic = filtered(Expr::prop("isbn").eq(Expr::binary(
            Operator::Mul,
            Expr::lit(2i64),
            Expr::param("x"),
        )));
        assert_eq!(
            check_structure(&meta, &arithmetic).unwrap_err().code(),
            QueryErrorCode::UnsupportedByOrm
        );

        let unknown = filtered(Expr::prop("missing").eq(Expr::param("t")));
        assert_eq!(
            check_structure(&meta, &unknown).unwrap_err().code(),
            QueryErrorCode::MalformedQuery
        );
    }

    #[test]
    fn test_bulk_statements_rejected() {
        let meta = book_meta();
        for statement in [StatementKind::Update, StatementKind::Delete] {
            let tree = filtered(Expr::prop("title").eq(Expr::lit("yar"))).with_statement(statement);
            let err = check_structure(&meta, &tree).unwrap_err();
            assert_eq!(err.code(), QueryErrorCode::UnsupportedByOrm);
            assert_eq!(err.operator(), Some(statement.token()));
        }
    }
}
