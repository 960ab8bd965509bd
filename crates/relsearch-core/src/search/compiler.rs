//! Search compiler: turns a validated request into a select query.

use super::filter::{self, Hop, Leaf};
use super::order;
use super::request::{OrderSpec, SearchItem, SearchRequest};
use super::validate::RuleSet;
use crate::catalog::Registry;
use crate::config::{HiddenFieldPolicy, SearchConfig};
use crate::error::{Error, Result};
use crate::query::{AliasAllocator, Boolean, ColumnRef, Predicate, SelectQuery};
use std::sync::Arc;
use tracing::debug;

/// Compiler options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Handling of hidden fields reached through a relation.
    pub hidden_field_policy: HiddenFieldPolicy,
}

/// Per-call compilation state.
///
/// Alias counters live here, never on the [`Searcher`], so concurrent calls
/// on a shared searcher cannot observe each other's aliases.
pub(crate) struct CompileContext<'r> {
    pub registry: &'r Registry,
    pub exists: AliasAllocator,
    pub joins: AliasAllocator,
    pub hidden_field_policy: HiddenFieldPolicy,
}

impl<'r> CompileContext<'r> {
    fn new(registry: &'r Registry, options: SearchOptions) -> Self {
        Self {
            registry,
            exists: AliasAllocator::for_exists(),
            joins: AliasAllocator::for_joins(),
            hidden_field_policy: options.hidden_field_policy,
        }
    }
}

/// Compiles search requests against a shared registry.
///
/// The searcher is immutable and cheap to clone; share one per process.
#[derive(Debug, Clone)]
pub struct Searcher {
    registry: Arc<Registry>,
    rules: RuleSet,
    options: SearchOptions,
}

impl Searcher {
    /// Create a searcher with default options.
    pub fn new(registry: Arc<Registry>) -> Self {
        let rules = RuleSet::from_registry(&registry);
        Self {
            registry,
            rules,
            options: SearchOptions::default(),
        }
    }

    /// Build a searcher from configuration.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let registry = config.build_registry()?;
        Ok(Self::new(Arc::new(registry)).with_options(SearchOptions {
            hidden_field_policy: config.hidden_field_policy,
        }))
    }

    /// Replace the compiler options.
    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    /// The registry searched against.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Compiler options.
    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Exposed search keys, sorted.
    pub fn list_entities(&self) -> Vec<&str> {
        self.registry.list_entities()
    }

    /// Compile with raw `order_by` / `order_as` parameters.
    pub fn compile_with(
        &self,
        request: &SearchRequest,
        order_by: Option<&str>,
        order_as: Option<&str>,
    ) -> Result<SelectQuery> {
        let order = OrderSpec::from_params(order_by, order_as)?;
        self.compile(request, order.as_ref())
    }

    /// Compile a request.
    ///
    /// Every item is validated and compiled, so a failure in any item fails
    /// the request, but only the last item's query is returned.
    pub fn compile(&self, request: &SearchRequest, order: Option<&OrderSpec>) -> Result<SelectQuery> {
        if request.is_empty() {
            return Err(Error::EmptyInput);
        }
        self.rules.validate(request).map_err(Error::Validation)?;

        let mut ctx = CompileContext::new(&self.registry, self.options);
        let mut compiled = None;
        for (index, item) in request.items.iter().enumerate() {
            compiled = Some(self.compile_item(&mut ctx, index, item, order)?);
        }

        compiled.ok_or(Error::EmptyInput)
    }

    fn compile_item(
        &self,
        ctx: &mut CompileContext<'_>,
        index: usize,
        item: &SearchItem,
        order: Option<&OrderSpec>,
    ) -> Result<SelectQuery> {
        let key = item.entity.as_deref().map(str::trim).unwrap_or_default();
        let entity = self
            .registry
            .resolve(key)
            .ok_or_else(|| Error::UnknownEntity(key.to_string()))?;
        if !entity.is_searchable() {
            return Err(Error::EntityNotSearchable(key.to_string()));
        }

        let table = entity.table();
        let mut query = SelectQuery::from_table(table);
        debug!(item = index, entity = entity.name(), table, "Compiling search item");

        for (position, criterion) in item.criteria().iter().enumerate() {
            let malformed = || Error::MalformedCriterion {
                item: index,
                criterion: position,
            };
            let operator = criterion.parsed_operator().ok_or_else(malformed)?;
            let value = criterion.value.as_ref().ok_or_else(malformed)?;
            let (relations, field) = criterion.path().ok_or_else(malformed)?;

            // The first criterion has nothing to its left to `or` with.
            let boolean = if position == 0 {
                Boolean::And
            } else {
                Boolean::from_or(criterion.or)
            };

            debug!(
                item = index,
                criterion = position,
                field,
                hops = relations.len(),
                operator = %operator,
                "Applying criterion"
            );

            if relations.is_empty() {
                query.push_where(
                    boolean,
                    Predicate::for_operator(ColumnRef::named(table, field), operator, value.clone()),
                );
            } else {
                let from = Hop {
                    entity,
                    qualifier: table,
                };
                let leaf = Leaf {
                    field,
                    operator,
                    value,
                };
                filter::walk(ctx, &mut query, from, &relations, leaf, boolean)?;
            }
        }

        if let Some(order) = order {
            order::apply(ctx, &mut query, entity, order)?;
        }

        query.select_all_of(table);
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityDef, RelationDef};
    use crate::query::{Direction, Operator};
    use crate::search::Criterion;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn registry() -> Registry {
        Registry::new()
            .with_entity(
                EntityDef::new("User", "users")
                    .searchable_entity()
                    .allow("posts")
                    .allow("manager")
                    .allow("roles")
                    .allow_leaves("profile", ["country"])
                    .hide("password")
                    .with_relation(RelationDef::has_many("posts", "Post", "user_id", "id"))
                    .with_relation(
                        RelationDef::has_many("published_posts", "Post", "user_id", "id")
                            .with_constraint("published", Operator::Eq, true),
                    )
                    .with_relation(RelationDef::has_one("profile", "Profile", "user_id", "id"))
                    .with_relation(RelationDef::belongs_to("manager", "User", "manager_id", "id"))
                    .with_relation(RelationDef::belongs_to_many(
                        "roles", "Role", "role_user", "user_id", "role_id",
                    ))
                    .with_relation(
                        RelationDef::has_many("secrets", "Secret", "user_id", "id")
                            .with_searchable(false),
                    ),
            )
            .with_entity(
                EntityDef::new("Post", "posts")
                    .searchable_entity()
                    .allow("author")
                    .with_relation(RelationDef::belongs_to("author", "User", "user_id", "id"))
                    .with_relation(RelationDef::has_many("comments", "Comment", "post_id", "id")),
            )
            .with_entity(EntityDef::new("Comment", "comments").hide("ip_address"))
            .with_entity(EntityDef::new("Profile", "profiles").hide("ssn"))
            .with_entity(EntityDef::new("Role", "roles"))
            .with_entity(EntityDef::new("Secret", "secrets"))
            .with_entity(EntityDef::new("Audit", "audits"))
            .expose("user", "User")
            .expose("post", "Post")
            .expose("audit", "Audit")
    }

    fn searcher() -> Searcher {
        Searcher::new(Arc::new(registry()))
    }

    fn user(criteria: Vec<Criterion>) -> SearchRequest {
        let mut item = SearchItem::new("user");
        for c in criteria {
            item = item.with(c);
        }
        SearchRequest::new(vec![item])
    }

    fn sql(request: &SearchRequest) -> String {
        searcher().compile(request, None).unwrap().to_sql().text
    }

    #[test]
    fn test_empty_request() {
        let err = searcher().compile(&SearchRequest::default(), None).unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }

    #[test]
    fn test_plain_equality() {
        let query = searcher()
            .compile(&user(vec![Criterion::new("name", "=", "Ann")]), None)
            .unwrap();
        let sql = query.to_sql();
        assert_eq!(sql.text, "select users.* from users where users.name = ?");
        assert_eq!(sql.bindings, vec![Value::from("Ann")]);
    }

    #[test]
    fn test_no_criteria_selects_all() {
        let request = SearchRequest::new(vec![SearchItem::new("user")]);
        assert_eq!(sql(&request), "select users.* from users");
    }

    #[test]
    fn test_in_from_comma_string() {
        let query = searcher()
            .compile(&user(vec![Criterion::new("id", "in", "1,2,3")]), None)
            .unwrap();
        let sql = query.to_sql();
        assert_eq!(sql.text, "select users.* from users where users.id in (?, ?, ?)");
        assert_eq!(
            sql.bindings,
            vec![Value::from("1"), Value::from("2"), Value::from("3")]
        );
    }

    #[test]
    fn test_in_from_array() {
        let query = searcher()
            .compile(&user(vec![Criterion::new("id", "IN", vec![4, 5])]), None)
            .unwrap();
        let sql = query.to_sql();
        assert_eq!(sql.text, "select users.* from users where users.id in (?, ?)");
        assert_eq!(sql.bindings, vec![Value::Int(4), Value::Int(5)]);
    }

    #[test]
    fn test_first_criterion_is_and() {
        let request = user(vec![
            Criterion::new("name", "=", "Ann").or(),
            Criterion::new("name", "=", "Bo").or(),
            Criterion::new("age", ">", 30),
        ]);
        let query = searcher().compile(&request, None).unwrap();
        assert_eq!(query.wheres[0].boolean, Boolean::And);
        assert_eq!(query.wheres[1].boolean, Boolean::Or);
        assert_eq!(
            query.to_sql().text,
            "select users.* from users where users.name = ? or users.name = ? and users.age > ?"
        );
    }

    #[test]
    fn test_single_hop_exists() {
        let request = user(vec![Criterion::new("posts.title", "=", "Hi")]);
        assert_eq!(
            sql(&request),
            "select users.* from users where exists (select * from posts as wherehas_0 \
             where users.id = wherehas_0.user_id and wherehas_0.title = ?)"
        );
    }

    #[test]
    fn test_nested_hops_get_distinct_aliases() {
        let request = SearchRequest::new(vec![SearchItem::new("user").with(Criterion::new(
            "posts.comments.body",
            "like",
            "%rust%",
        ))]);
        let query = searcher().compile(&request, None).unwrap();

        assert_eq!(
            query.to_sql().text,
            "select users.* from users where exists (select * from posts as wherehas_0 \
             where users.id = wherehas_0.user_id and exists (select * from comments as wherehas_1 \
             where wherehas_0.id = wherehas_1.post_id and wherehas_1.body like ?))"
        );

        let level1: Vec<&SelectQuery> = query.exists_subqueries().collect();
        assert_eq!(level1.len(), 1);
        let level2: Vec<&SelectQuery> = level1[0].exists_subqueries().collect();
        assert_eq!(level2.len(), 1);
        assert_eq!(level2[0].exists_count(), 0);
    }

    #[test]
    fn test_independent_criteria_do_not_share_aliases() {
        let request = user(vec![
            Criterion::new("posts.title", "=", "a"),
            Criterion::new("posts.title", "=", "b").or(),
        ]);
        let query = searcher().compile(&request, None).unwrap();
        let aliases: Vec<&str> = query
            .exists_subqueries()
            .map(|sub| sub.from.qualifier())
            .collect();
        assert_eq!(aliases, vec!["wherehas_0", "wherehas_1"]);
        assert_eq!(query.wheres[1].boolean, Boolean::Or);
    }

    #[test]
    fn test_self_relation() {
        let request = user(vec![Criterion::new("manager.manager.name", "=", "Bo")]);
        assert_eq!(
            sql(&request),
            "select users.* from users where exists (select * from users as wherehas_0 \
             where users.manager_id = wherehas_0.id and exists (select * from users as wherehas_1 \
             where wherehas_0.manager_id = wherehas_1.id and wherehas_1.name = ?))"
        );
    }

    #[test]
    fn test_relation_constraint_is_aliased() {
        let request = user(vec![Criterion::new("published_posts.title", "=", "Hi")]);
        let sql = searcher().compile(&request, None).unwrap().to_sql();
        assert_eq!(
            sql.text,
            "select users.* from users where exists (select * from posts as wherehas_0 \
             where users.id = wherehas_0.user_id and wherehas_0.published = ? and wherehas_0.title = ?)"
        );
        assert_eq!(sql.bindings, vec![Value::Bool(true), Value::from("Hi")]);
    }

    #[test]
    fn test_belongs_to_many_through_pivot() {
        let request = user(vec![Criterion::new("roles.name", "=", "admin")]);
        assert_eq!(
            sql(&request),
            "select users.* from users where exists (select * from roles as wherehas_0 \
             inner join role_user on wherehas_0.id = role_user.role_id \
             where users.id = role_user.user_id and wherehas_0.name = ?)"
        );
    }

    #[test]
    fn test_hidden_leaf_is_dropped() {
        let request = user(vec![
            Criterion::new("name", "=", "Ann"),
            Criterion::new("profile.ssn", "=", "123"),
        ]);
        let query = searcher().compile(&request, None).unwrap();
        assert_eq!(query.value_predicate_count(), 1);
        assert_eq!(
            query.to_sql().text,
            "select users.* from users where users.name = ? and exists \
             (select * from profiles as wherehas_0 where users.id = wherehas_0.user_id)"
        );
    }

    #[test]
    fn test_hidden_leaf_denied_by_policy() {
        let searcher = searcher().with_options(SearchOptions {
            hidden_field_policy: HiddenFieldPolicy::Deny,
        });
        let request = user(vec![Criterion::new("posts.comments.ip_address", "=", "1.2.3.4")]);
        match searcher.compile(&request, None) {
            Err(Error::PermissionDenied { entity, field }) => {
                assert_eq!(entity, "Comment");
                assert_eq!(field, "ip_address");
            }
            other => panic!("expected permission denied, got {:?}", other),
        }
    }

    #[test]
    fn test_unsearchable_relation_is_skipped() {
        let request = user(vec![Criterion::new("secrets.code", "=", "x")]);
        assert_eq!(sql(&request), "select users.* from users");
    }

    #[test]
    fn test_unknown_relation() {
        let request = user(vec![Criterion::new("ghosts.name", "=", "x")]);
        assert!(matches!(
            searcher().compile(&request, None),
            Err(Error::UnknownRelation { .. })
        ));
    }

    #[test]
    fn test_unknown_entity_fails_validation() {
        let request = SearchRequest::new(vec![
            SearchItem::new("user"),
            SearchItem::new("bogus").with(Criterion::new("name", "=", "x")),
        ]);
        match searcher().compile(&request, None) {
            Err(Error::Validation(bag)) => {
                assert_eq!(bag.get("1.entity"), ["Entity at #1 is not a valid entity reference"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_entity_not_searchable() {
        let request = SearchRequest::new(vec![SearchItem::new("audit")]);
        let err = searcher().compile(&request, None).unwrap_err();
        assert!(matches!(err, Error::EntityNotSearchable(ref key) if key == "audit"));
    }

    #[test]
    fn test_last_item_wins() {
        let request = SearchRequest::new(vec![
            SearchItem::new("user").with(Criterion::new("posts.title", "=", "a")),
            SearchItem::new("post").with(Criterion::new("author.name", "=", "Ann")),
        ]);
        assert_eq!(
            sql(&request),
            "select posts.* from posts where exists (select * from users as wherehas_1 \
             where posts.user_id = wherehas_1.id and wherehas_1.name = ?)"
        );
    }

    #[test]
    fn test_error_in_earlier_item_fails_request() {
        let request = SearchRequest::new(vec![
            SearchItem::new("audit"),
            SearchItem::new("user"),
        ]);
        assert!(searcher().compile(&request, None).is_err());
    }

    #[test]
    fn test_plain_order() {
        let searcher = searcher();
        let request = user(vec![Criterion::new("name", "=", "Ann")]);
        let query = searcher
            .compile_with(&request, Some("name"), Some("DESC"))
            .unwrap();
        assert_eq!(
            query.to_sql().text,
            "select users.* from users where users.name = ? order by users.name desc"
        );

        let query = searcher.compile_with(&request, Some("name"), None).unwrap();
        assert!(query.order_by.is_empty());
        let query = searcher.compile_with(&request, None, Some("asc")).unwrap();
        assert!(query.order_by.is_empty());
    }

    #[test]
    fn test_order_through_relation() {
        let request = SearchRequest::new(vec![SearchItem::new("user")]);
        let order = OrderSpec::new("profile.country", Direction::Desc);
        let query = searcher().compile(&request, Some(&order)).unwrap();
        assert_eq!(
            query.to_sql().text,
            "select users.* from users left join profiles as joined_0 \
             on users.id = joined_0.user_id order by joined_0.country desc"
        );
    }

    #[test]
    fn test_order_chain_revisiting_table() {
        let request = SearchRequest::new(vec![SearchItem::new("post")]);
        let order = OrderSpec::new("author.manager.name", Direction::Asc);
        let query = searcher().compile(&request, Some(&order)).unwrap();
        assert_eq!(
            query.to_sql().text,
            "select posts.* from posts left join users as joined_0 on joined_0.id = posts.user_id \
             left join users as joined_1 on joined_1.id = joined_0.manager_id \
             order by joined_1.name asc"
        );
    }

    #[test]
    fn test_order_outside_allow_list() {
        let request = SearchRequest::new(vec![SearchItem::new("user")]);
        let order = OrderSpec::new("secrets.code", Direction::Asc);
        match searcher().compile(&request, Some(&order)) {
            Err(Error::PermissionDenied { entity, field }) => {
                assert_eq!(entity, "User");
                assert_eq!(field, "secrets");
            }
            other => panic!("expected permission denied, got {:?}", other),
        }
    }

    #[test]
    fn test_order_leaf_outside_allow_list() {
        let request = SearchRequest::new(vec![SearchItem::new("user")]);
        let order = OrderSpec::new("profile.street", Direction::Asc);
        assert!(matches!(
            searcher().compile(&request, Some(&order)),
            Err(Error::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_order_many_to_many_unsupported() {
        let request = SearchRequest::new(vec![SearchItem::new("user")]);
        let order = OrderSpec::new("roles.name", Direction::Asc);
        assert!(matches!(
            searcher().compile(&request, Some(&order)),
            Err(Error::UnsupportedRelation { .. })
        ));
    }

    #[test]
    fn test_bad_order_direction() {
        let request = SearchRequest::new(vec![SearchItem::new("user")]);
        let err = searcher()
            .compile_with(&request, Some("name"), Some("up"))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref bag) if bag.has("order.direction")));
    }

    #[test]
    fn test_order_by_hidden_field_denied() {
        let request = SearchRequest::new(vec![SearchItem::new("user")]);
        match searcher().compile_with(&request, Some("password"), Some("asc")) {
            Err(Error::PermissionDenied { entity, field }) => {
                assert_eq!(entity, "User");
                assert_eq!(field, "password");
            }
            other => panic!("expected permission denied, got {:?}", other),
        }

        // `author` allows any leaf, but the leaf is hidden on `User`.
        let request = SearchRequest::new(vec![SearchItem::new("post")]);
        let order = OrderSpec::new("author.password", Direction::Desc);
        assert!(matches!(
            searcher().compile(&request, Some(&order)),
            Err(Error::PermissionDenied { ref field, .. }) if field == "password"
        ));
    }

    #[test]
    fn test_field_injection_is_rejected() {
        let request = user(vec![Criterion::new("name = 'x' or 1 = 1 or name", "=", "Ann")]);
        match searcher().compile(&request, None) {
            Err(Error::Validation(bag)) => assert!(bag.has("0.criteria.0.field")),
            other => panic!("expected validation error, got {:?}", other),
        }

        let request = user(vec![Criterion::new("posts.title) or (1 = 1", "=", "Hi")]);
        assert!(matches!(
            searcher().compile(&request, None),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_order_injection_is_rejected() {
        let request = SearchRequest::new(vec![SearchItem::new("user")]);
        let err = searcher()
            .compile_with(
                &request,
                Some("name, (select password from users limit 1)"),
                Some("asc"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref bag) if bag.has("order.path")));

        // An `OrderSpec` built in code skips parameter parsing, so the name is quoted.
        let order = OrderSpec::new("name, (select password from users limit 1)", Direction::Asc);
        let query = searcher().compile(&request, Some(&order)).unwrap();
        assert_eq!(
            query.to_sql().text,
            "select users.* from users \
             order by users.\"name, (select password from users limit 1)\" asc"
        );
    }

    #[test]
    fn test_from_config() {
        let config = SearchConfig::from_json(
            r#"{"search_models": {"user": "User"},
                "entities": [{"name": "User", "table": "users", "is_searchable": true}],
                "hidden_field_policy": "deny"}"#,
        )
        .unwrap();
        let searcher = Searcher::from_config(&config).unwrap();
        assert_eq!(searcher.list_entities(), vec!["user"]);
        assert_eq!(searcher.options().hidden_field_policy, HiddenFieldPolicy::Deny);
    }
}
