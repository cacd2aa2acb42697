//! Tests executing GraphQL documents against compiled schemas

#![allow(clippy::unwrap_used)]

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_graphql::dynamic::TypeRef;
use async_graphql::{Request, Value as GqlValue};
use futures::FutureExt;
use neodeliver_core::dbs::Session;
use neodeliver_core::fault::{Fault, FaultReporter};
use neodeliver_core::filter;
use neodeliver_core::gql::{
	Args, Argument, Builder, ById, Call, Direction, Field, GqlError, Meta, Record, RecordRef, Schema,
	Scope, TypeGraph,
};
use neodeliver_core::iam::Auth;
use neodeliver_core::kvs::{Filter, MemStore, Store};
use neodeliver_core::val::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use test_log::test;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Contact {
	#[serde(rename = "_id")]
	id: String,
	organization_id: String,
	given_name: String,
	email: Option<String>,
	balance: Decimal,
	#[serde(flatten)]
	address: Address,
	secret: String,
}

impl Record for Contact {
	const NAME: &'static str = "Contact";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<String>("_id").rename("id"),
			Field::new::<String>("organization_id"),
			Field::new::<String>("given_name"),
			Field::new::<Option<String>>("email"),
			Field::new::<Decimal>("balance"),
			Field::embed::<Address>("address"),
			Field::new::<String>("secret").skip(),
		]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Address {
	city: String,
	zip: Option<String>,
}

impl Record for Address {
	const NAME: &'static str = "Address";

	fn fields() -> Vec<Field> {
		vec![Field::new::<String>("city"), Field::new::<Option<String>>("zip")]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Preferences {
	#[serde(rename = "_id")]
	organization_id: String,
	theme: String,
	digest: bool,
}

impl Preferences {
	fn default_for(organization: &str) -> Self {
		Self {
			organization_id: organization.to_owned(),
			theme: "light".to_owned(),
			digest: true,
		}
	}
}

impl Record for Preferences {
	const NAME: &'static str = "Preferences";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<String>("_id").rename("organization_id"),
			Field::new::<String>("theme"),
			Field::new::<bool>("digest"),
		]
	}

	fn fallback() -> Option<fn(&str) -> Self> {
		Some(Self::default_for)
	}
}

/// A record whose list query collides with the one of [`Contact`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Contacts {
	total: i64,
}

impl Record for Contacts {
	const NAME: &'static str = "Contacts";

	fn fields() -> Vec<Field> {
		vec![Field::new::<i64>("total")]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct NewContact {
	given_name: String,
	email: Option<String>,
}

impl Record for NewContact {
	const NAME: &'static str = "NewContact";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<String>("given_name").required().max_len(20),
			Field::new::<Option<String>>("email").pattern(r"^[^@\s]+@[^@\s]+$"),
		]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Amounts {
	amounts: Vec<Decimal>,
}

impl Record for Amounts {
	const NAME: &'static str = "Amounts";

	fn fields() -> Vec<Field> {
		vec![Field::new::<Vec<Decimal>>("amounts")]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Greeting {
	greeting: String,
}

impl Record for Greeting {
	const NAME: &'static str = "Greeting";

	fn fields() -> Vec<Field> {
		vec![Field::new::<String>("greeting")]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Recipient {
	name: String,
}

impl Record for Recipient {
	const NAME: &'static str = "Recipient";

	fn fields() -> Vec<Field> {
		vec![Field::new::<String>("name")]
	}
}

/// Declares the same argument as [`Greeting`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Salutation {
	greeting: String,
}

impl Record for Salutation {
	const NAME: &'static str = "Salutation";

	fn fields() -> Vec<Field> {
		vec![Field::new::<String>("greeting")]
	}
}

static ADDED: AtomicUsize = AtomicUsize::new(0);
static PURGED: AtomicUsize = AtomicUsize::new(0);

async fn by_organization(auth: Auth) -> Filter {
	filter!("organization_id" => auth.organization_id)
}

async fn contact_filter(auth: Auth, Args(by): Args<ById>) -> Filter {
	filter!("_id" => by.id, "organization_id" => auth.organization_id)
}

async fn own_preferences(auth: Auth) -> Filter {
	filter!("_id" => auth.organization_id)
}

async fn add_contact(meta: Meta, auth: Auth, Args(new): Args<NewContact>) -> Result<Contact, GqlError> {
	ADDED.fetch_add(1, Ordering::SeqCst);
	let contact = Contact {
		id: format!("c{}", ADDED.load(Ordering::SeqCst)),
		organization_id: auth.organization_id,
		given_name: new.given_name,
		email: new.email,
		..Default::default()
	};
	meta.store.save(&contact).await?;
	Ok(contact)
}

async fn purge_contacts(_: Meta) -> bool {
	PURGED.fetch_add(1, Ordering::SeqCst);
	true
}

async fn total(Args(args): Args<Amounts>) -> Decimal {
	args.amounts.into_iter().fold(Decimal::zero(), |acc, d| acc + d)
}

async fn explode(_: Meta) -> bool {
	panic!("the resolver exploded")
}

async fn linger(_: Meta) -> bool {
	tokio::time::sleep(Duration::from_secs(30)).await;
	true
}

async fn ping() {}

async fn greet(Args(g): Args<Greeting>, Args(r): Args<Recipient>) -> String {
	format!("{} {}", g.greeting, r.name)
}

async fn salute(Args(g): Args<Greeting>, Args(s): Args<Salutation>) -> String {
	format!("{} {}", g.greeting, s.greeting)
}

fn masked(call: &Call, mut value: Value) -> Result<Value, GqlError> {
	if call.arg("masked") == Some(&GqlValue::Boolean(true)) {
		if let Some(name) = value.get_mut("given_name") {
			*name = json!("***");
		}
	}
	Ok(value)
}

fn auth() -> Auth {
	Auth::new("sub", "user-1", "org-1").with_scope("contacts:read")
}

fn builder(store: &Store) -> Builder {
	let mut builder = Builder::new(store.clone());
	builder.query::<Contact>().filter(contact_filter);
	builder.query::<Vec<Contact>>().filter(by_organization);
	builder.query::<Preferences>().filter(own_preferences);
	builder.query_fn(total);
	builder.mutation(add_contact);
	builder.mutation(ping);
	builder.mutation(purge_contacts).guard(Scope("contacts:delete"));
	builder
}

async fn seed(store: &Store, organization: &str, count: usize) -> Result<()> {
	for i in 1..=count {
		let contact = Contact {
			id: format!("{organization}-{i}"),
			organization_id: organization.to_owned(),
			given_name: format!("contact {i}"),
			balance: "12.50".parse()?,
			address: Address {
				city: "Brussels".to_owned(),
				zip: None,
			},
			secret: "hidden".to_owned(),
			..Default::default()
		};
		store.save(&contact).await?;
	}
	Ok(())
}

async fn run(schema: &Schema, session: Session, query: &str) -> Value {
	let res = schema.execute(Request::new(query).data(session)).await;
	serde_json::to_value(&res).unwrap()
}

fn codes(res: &Value) -> Vec<String> {
	res["errors"]
		.as_array()
		.map(|errors| {
			errors.iter().map(|e| e["extensions"]["code"].as_str().unwrap_or_default().to_owned()).collect()
		})
		.unwrap_or_default()
}

#[test(tokio::test)]
async fn output_types_carry_every_declared_field() -> Result<()> {
	let store = Store::new(MemStore::new());
	let schema = builder(&store).build()?;
	let res = run(&schema, Session::for_auth(auth()), r#"{ __type(name: "Contact") { fields { name } } }"#).await;
	let names: Vec<&str> =
		res["data"]["__type"]["fields"].as_array().unwrap().iter().map(|f| f["name"].as_str().unwrap()).collect();
	assert_eq!(names, ["id", "organization_id", "given_name", "email", "balance", "city", "zip"]);
	Ok(())
}

#[test]
fn compiled_types_are_shared() -> Result<()> {
	let mut graph = TypeGraph::new();
	let first = graph.record(RecordRef::of::<Contact>(), Direction::Output)?;
	let again = graph.record(RecordRef::of::<Contact>(), Direction::Output)?;
	assert!(Arc::ptr_eq(&first, &again));
	let input = graph.record(RecordRef::of::<Contact>(), Direction::Input)?;
	assert_eq!(input.name(), "InContact");
	assert!(!Arc::ptr_eq(&first, &input));
	Ok(())
}

#[test(tokio::test)]
async fn documents_are_rendered_on_the_wire() -> Result<()> {
	let store = Store::new(MemStore::new());
	seed(&store, "org-1", 1).await?;
	let schema = builder(&store).build()?;
	let res = run(
		&schema,
		Session::for_auth(auth()),
		r#"{ contact(id: "org-1-1") { id given_name email balance city zip } }"#,
	)
	.await;
	assert_eq!(
		res,
		json!({"data": {"contact": {
			"id": "org-1-1",
			"given_name": "contact 1",
			"email": null,
			"balance": "12.5",
			"city": "Brussels",
			"zip": null,
		}}})
	);
	Ok(())
}

#[test(tokio::test)]
async fn missing_records_use_their_default() -> Result<()> {
	let store = Store::new(MemStore::new());
	let schema = builder(&store).build()?;
	let res = run(&schema, Session::for_auth(auth()), "{ preferences { organization_id theme digest } }").await;
	assert_eq!(
		res,
		json!({"data": {"preferences": {"organization_id": "org-1", "theme": "light", "digest": true}}})
	);
	let res = run(&schema, Session::for_auth(auth()), r#"{ contact(id: "nobody") { id } }"#).await;
	assert_eq!(res, json!({"data": {"contact": null}}));
	Ok(())
}

#[test(tokio::test)]
async fn stored_records_win_over_the_default() -> Result<()> {
	let store = Store::new(MemStore::new());
	store
		.save(&Preferences {
			organization_id: "org-1".to_owned(),
			theme: "dark".to_owned(),
			digest: false,
		})
		.await?;
	let schema = builder(&store).build()?;
	let res = run(&schema, Session::for_auth(auth()), "{ preferences { theme digest } }").await;
	assert_eq!(res, json!({"data": {"preferences": {"theme": "dark", "digest": false}}}));
	Ok(())
}

#[test(tokio::test)]
async fn lists_are_paged() -> Result<()> {
	let store = Store::new(MemStore::new());
	seed(&store, "org-1", 5).await?;
	seed(&store, "org-2", 3).await?;
	let schema = builder(&store).build()?;
	let res = run(&schema, Session::for_auth(auth()), "{ contacts(first: 2, offset: 1) { id } }").await;
	assert_eq!(res, json!({"data": {"contacts": [{"id": "org-1-2"}, {"id": "org-1-3"}]}}));
	let res = run(&schema, Session::for_auth(auth()), "{ contacts { id } }").await;
	assert_eq!(res["data"]["contacts"].as_array().unwrap().len(), 5);
	let res = run(&schema, Session::for_auth(auth()), "{ contacts(first: 0) { id } }").await;
	assert_eq!(res["data"]["contacts"].as_array().unwrap().len(), 5);
	let res = run(&schema, Session::for_auth(auth()), "{ contacts(first: -1) { id } }").await;
	assert_eq!(codes(&res), ["BAD_ARGUMENT"]);
	Ok(())
}

#[test(tokio::test)]
async fn invalid_arguments_never_reach_the_resolver() -> Result<()> {
	let store = Store::new(MemStore::new());
	let schema = builder(&store).build()?;
	let before = ADDED.load(Ordering::SeqCst);
	let res = run(&schema, Session::for_auth(auth()), r#"mutation { add_contact(given_name: "") { id } }"#).await;
	assert_eq!(res["data"], json!({"add_contact": null}));
	assert_eq!(codes(&res), ["VALIDATION"]);
	let res = run(
		&schema,
		Session::for_auth(auth()),
		r#"mutation { add_contact(given_name: "Ann", email: "not an address") { id } }"#,
	)
	.await;
	assert_eq!(codes(&res), ["VALIDATION"]);
	assert_eq!(ADDED.load(Ordering::SeqCst), before);
	let res = run(
		&schema,
		Session::for_auth(auth()),
		r#"mutation { add_contact(given_name: "Ann", email: "ann@example.com") { given_name email organization_id } }"#,
	)
	.await;
	assert_eq!(
		res,
		json!({"data": {"add_contact": {"given_name": "Ann", "email": "ann@example.com", "organization_id": "org-1"}}})
	);
	assert_eq!(ADDED.load(Ordering::SeqCst), before + 1);
	Ok(())
}

#[test(tokio::test)]
async fn guards_suppress_the_resolver() -> Result<()> {
	let store = Store::new(MemStore::new());
	let schema = builder(&store).build()?;
	let res = run(&schema, Session::for_auth(auth()), "mutation { purge_contacts }").await;
	assert_eq!(res["data"], json!({"purge_contacts": null}));
	assert_eq!(codes(&res), ["FORBIDDEN"]);
	assert_eq!(res["errors"][0]["path"], json!(["purge_contacts"]));
	assert_eq!(PURGED.load(Ordering::SeqCst), 0);
	Ok(())
}

#[test(tokio::test)]
async fn guards_run_before_arguments_are_checked() -> Result<()> {
	let store = Store::new(MemStore::new());
	let mut builder = Builder::new(store.clone());
	builder.query::<Contact>().filter(contact_filter);
	builder.mutation(add_contact).guard(Scope("contacts:write"));
	let schema = builder.build()?;
	let res = run(&schema, Session::for_auth(auth()), r#"mutation { add_contact(given_name: "") { id } }"#).await;
	assert_eq!(res["data"], json!({"add_contact": null}));
	assert_eq!(codes(&res), ["FORBIDDEN"]);
	Ok(())
}

#[test(tokio::test)]
async fn argument_records_are_merged() -> Result<()> {
	let store = Store::new(MemStore::new());
	let mut builder = builder(&store);
	builder.query_fn(greet);
	let schema = builder.build()?;
	let res = run(&schema, Session::for_auth(auth()), r#"{ greet(greeting: "hello", name: "Ann") }"#).await;
	assert_eq!(res, json!({"data": {"greet": "hello Ann"}}));
	Ok(())
}

#[test]
fn overlapping_argument_records_fail_to_compile() {
	let store = Store::new(MemStore::new());
	let mut builder = builder(&store);
	builder.query_fn(salute);
	let err = builder.build().unwrap_err();
	assert!(matches!(&err, GqlError::SchemaError(msg) if msg.contains("greeting")), "{err}");
}

#[test(tokio::test)]
async fn extra_arguments_reach_the_post_processor() -> Result<()> {
	let store = Store::new(MemStore::new());
	seed(&store, "org-1", 1).await?;
	let mut builder = Builder::new(store.clone());
	builder
		.query::<Contact>()
		.filter(contact_filter)
		.arg(Argument::new("masked", TypeRef::named_nn(TypeRef::BOOLEAN)).default_value(false))
		.after(masked);
	let schema = builder.build()?;
	let res = run(&schema, Session::for_auth(auth()), r#"{ contact(id: "org-1-1") { given_name } }"#).await;
	assert_eq!(res, json!({"data": {"contact": {"given_name": "contact 1"}}}));
	let res =
		run(&schema, Session::for_auth(auth()), r#"{ contact(id: "org-1-1", masked: true) { given_name } }"#).await;
	assert_eq!(res, json!({"data": {"contact": {"given_name": "***"}}}));
	Ok(())
}

#[test]
fn extra_arguments_cannot_shadow_paging() {
	let store = Store::new(MemStore::new());
	let mut builder = Builder::new(store.clone());
	builder
		.query::<Vec<Contact>>()
		.filter(by_organization)
		.arg(Argument::new("first", TypeRef::named(TypeRef::INT)));
	let err = builder.build().unwrap_err();
	assert!(matches!(&err, GqlError::SchemaError(msg) if msg.contains("declares the argument `first`")), "{err}");
}

#[test(tokio::test)]
async fn field_errors_leave_siblings_resolved() -> Result<()> {
	let store = Store::new(MemStore::new());
	seed(&store, "org-1", 1).await?;
	let schema = builder(&store).build()?;
	// The default session cannot resolve an identity
	let res = run(&schema, Session::default(), r#"{ contacts { id } total(amounts: ["1"]) }"#).await;
	assert_eq!(res["data"], json!({"contacts": null, "total": "1"}));
	assert_eq!(codes(&res), ["UNAUTHENTICATED"]);
	Ok(())
}

#[test(tokio::test)]
async fn decimals_travel_as_strings() -> Result<()> {
	let store = Store::new(MemStore::new());
	let schema = builder(&store).build()?;
	let res = run(&schema, Session::default(), r#"{ total(amounts: ["0.1", "0.2", "1.70"]) }"#).await;
	assert_eq!(res, json!({"data": {"total": "2"}}));
	let res = run(&schema, Session::default(), r#"{ total(amounts: "0.25") }"#).await;
	assert_eq!(res, json!({"data": {"total": "0.25"}}));
	Ok(())
}

#[test(tokio::test)]
async fn empty_results_are_true() -> Result<()> {
	let store = Store::new(MemStore::new());
	let schema = builder(&store).build()?;
	let res = run(&schema, Session::default(), "mutation { ping }").await;
	assert_eq!(res, json!({"data": {"ping": true}}));
	Ok(())
}

#[test]
fn colliding_field_names_fail_to_compile() {
	let store = Store::new(MemStore::new());
	let mut builder = builder(&store);
	builder.query::<Vec<Contacts>>();
	let err = builder.build().unwrap_err();
	assert!(matches!(&err, GqlError::SchemaError(msg) if msg.contains("contacts")), "{err}");
}

#[test]
fn registering_a_query_twice_fails() {
	let store = Store::new(MemStore::new());
	let mut builder = builder(&store);
	builder.query::<Preferences>();
	assert!(matches!(builder.build(), Err(GqlError::SchemaError(_))));
}

#[test]
fn closures_need_an_explicit_name() {
	let store = Store::new(MemStore::new());
	let mut builder = builder(&store);
	builder.mutation(|_: Meta| async { true });
	assert!(matches!(builder.build(), Err(GqlError::SchemaError(_))));
	let mut builder = self::builder(&store);
	builder.mutation_named("noop", |_: Meta| async { true });
	assert!(builder.build().is_ok());
}

#[test]
fn schemas_need_a_query() {
	let mut builder = Builder::new(MemStore::new());
	builder.mutation(ping);
	assert!(matches!(builder.build(), Err(GqlError::SchemaError(_))));
}

struct Counting(AtomicUsize);

#[async_trait::async_trait]
impl FaultReporter for Counting {
	fn report(&self, fault: &Fault) {
		assert_eq!(fault.field, "explode");
		assert_eq!(fault.message, "the resolver exploded");
		self.0.fetch_add(1, Ordering::SeqCst);
	}

	async fn flush(&self, _: Duration) {}
}

#[test(tokio::test)]
async fn faults_are_reported_and_raised_again() -> Result<()> {
	let reporter = Arc::new(Counting(AtomicUsize::new(0)));
	let mut builder = Builder::new(MemStore::new()).with_reporter(reporter.clone());
	builder.query_fn(explode);
	let schema = builder.build()?;
	let req = Request::new("{ explode }").data(Session::default());
	let res = AssertUnwindSafe(schema.execute(req)).catch_unwind().await;
	assert!(res.is_err());
	assert_eq!(reporter.0.load(Ordering::SeqCst), 1);
	Ok(())
}

#[test(tokio::test)]
async fn cancelled_sessions_stop_resolving() -> Result<()> {
	let mut builder = Builder::new(MemStore::new());
	builder.query_fn(linger);
	let schema = builder.build()?;
	let token = CancellationToken::new();
	token.cancel();
	let res = run(&schema, Session::default().with_cancellation(token), "{ linger }").await;
	assert_eq!(res["data"], json!({"linger": null}));
	assert_eq!(codes(&res), ["CANCELLED"]);
	let res = run(&schema, Session::default().with_timeout(Duration::from_millis(20)), "{ linger }").await;
	assert_eq!(codes(&res), ["CANCELLED"]);
	Ok(())
}
