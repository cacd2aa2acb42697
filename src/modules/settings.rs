//! The settings of users and organizations.

use chrono::{DateTime, Utc};
use neodeliver_core::filter;
use neodeliver_core::gql::{Args, Builder, Field, GqlError, Meta, Module, Record, Scope};
use neodeliver_core::iam::Auth;
use neodeliver_core::kvs::{self, Filter};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A person who connects to the interface. A user can be a member of
/// several teams, and is visible to the managers of each of them.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
	#[serde(rename = "_id")]
	pub id: String,
	pub name: String,
	pub email: String,
	pub title: String,
	pub lang: String,
	pub time_zone: String,
	pub time_format: String,
	pub country: String,
	pub profile_picture: String,
	pub created_at: Option<DateTime<Utc>>,
	pub updated_at: Option<DateTime<Utc>>,
}

impl Record for User {
	const NAME: &'static str = "User";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<String>("_id").rename("id"),
			Field::new::<String>("name"),
			Field::new::<String>("email"),
			Field::new::<String>("title"),
			Field::new::<String>("lang"),
			Field::new::<String>("time_zone"),
			Field::new::<String>("time_format"),
			Field::new::<String>("country"),
			Field::new::<String>("profile_picture"),
			Field::new::<Option<DateTime<Utc>>>("created_at"),
			Field::new::<Option<DateTime<Utc>>>("updated_at"),
		]
	}

	fn description() -> Option<&'static str> {
		Some("The user the request acts as")
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMember {
	#[serde(rename = "_id")]
	pub id: String,
	pub organization_id: String,
	pub user_id: String,
	pub role: String,
	pub name: String,
	pub email: String,
	pub profile_picture: String,
	pub created_at: Option<DateTime<Utc>>,
	pub deleted_at: Option<DateTime<Utc>>,
}

impl Record for TeamMember {
	const NAME: &'static str = "TeamMember";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<String>("_id").rename("id"),
			Field::new::<String>("organization_id"),
			Field::new::<String>("user_id"),
			Field::new::<String>("role"),
			Field::new::<String>("name"),
			Field::new::<String>("email"),
			Field::new::<String>("profile_picture"),
			Field::new::<Option<DateTime<Utc>>>("created_at"),
			Field::new::<Option<DateTime<Utc>>>("deleted_at").skip(),
		]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactSettings {
	#[serde(rename = "_id")]
	pub organization_id: String,
	pub tracking: TrackingSettings,
	pub email: ContactEmailSettings,
	pub sms: ContactSmsSettings,
}

impl ContactSettings {
	/// The settings of an organization which never saved any.
	pub fn default_for(organization: &str) -> Self {
		Self {
			organization_id: organization.to_owned(),
			tracking: TrackingSettings {
				click_tracking: true,
				open_tracking: true,
				google_analytics: None,
			},
			email: ContactEmailSettings::default(),
			sms: ContactSmsSettings::default(),
		}
	}
}

impl Record for ContactSettings {
	const NAME: &'static str = "ContactSettings";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<String>("_id").rename("organization_id"),
			Field::new::<TrackingSettings>("tracking"),
			Field::new::<ContactEmailSettings>("email"),
			Field::new::<ContactSmsSettings>("sms"),
		]
	}

	fn fallback() -> Option<fn(&str) -> Self> {
		Some(Self::default_for)
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
	pub click_tracking: bool,
	pub open_tracking: bool,
	pub google_analytics: Option<GoogleAnalyticsSettings>,
}

impl Record for TrackingSettings {
	const NAME: &'static str = "TrackingSettings";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<bool>("click_tracking"),
			Field::new::<bool>("open_tracking"),
			Field::new::<Option<GoogleAnalyticsSettings>>("google_analytics"),
		]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactEmailSettings {
	pub google_analytics: Option<GoogleAnalyticsSettings>,
	pub blacklist_mode: bool,
	pub restriction_list: Vec<String>,
	pub unsubscribe_link: bool,
}

impl Record for ContactEmailSettings {
	const NAME: &'static str = "ContactEmailSettings";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<Option<GoogleAnalyticsSettings>>("google_analytics"),
			Field::new::<bool>("blacklist_mode"),
			Field::new::<Vec<String>>("restriction_list"),
			Field::new::<bool>("unsubscribe_link"),
		]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactSmsSettings {
	pub unsubscribe_link: bool,
}

impl Record for ContactSmsSettings {
	const NAME: &'static str = "ContactSMSSettings";

	fn fields() -> Vec<Field> {
		vec![Field::new::<bool>("unsubscribe_link")]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleAnalyticsSettings {
	pub source: String,
	pub medium: String,
	pub term: String,
	pub content: String,
}

impl Record for GoogleAnalyticsSettings {
	const NAME: &'static str = "GoogleAnalyticsSettings";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<String>("source"),
			Field::new::<String>("medium"),
			Field::new::<String>("term"),
			Field::new::<String>("content"),
		]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
	pub two_factor_enabled: bool,
}

impl Record for SecuritySettings {
	const NAME: &'static str = "SecuritySettings";

	fn fields() -> Vec<Field> {
		vec![Field::new::<bool>("two_factor_enabled")]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditUser {
	pub name: Option<String>,
	pub title: Option<String>,
	pub lang: Option<String>,
}

impl Record for EditUser {
	const NAME: &'static str = "EditUser";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<Option<String>>("name").max_len(150),
			Field::new::<Option<String>>("title").max_len(150),
			Field::new::<Option<String>>("lang").one_of(&["en", "de", "fr", "nl"]),
		]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AddRestrictedEmail {
	pub email: String,
}

impl Record for AddRestrictedEmail {
	const NAME: &'static str = "AddRestrictedEmail";

	fn fields() -> Vec<Field> {
		vec![Field::new::<String>("email").required().max_len(254).pattern(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")]
	}
}

async fn current_user(auth: Auth) -> Filter {
	filter!("_id" => auth.user_id)
}

async fn active_members(auth: Auth) -> Filter {
	filter!("organization_id" => auth.organization_id, "deleted_at" => Value::Null)
}

async fn own_organization(auth: Auth) -> Filter {
	filter!("_id" => auth.organization_id)
}

async fn security_settings(_: Auth) -> SecuritySettings {
	SecuritySettings::default()
}

async fn edit_user(meta: Meta, auth: Auth, Args(args): Args<EditUser>) -> Result<User, GqlError> {
	// Only the members which were passed are updated
	let mut set = kvs::to_document(&args)?;
	set.retain(|_, v| !v.is_null());
	set.insert("updated_at".to_owned(), serde_json::to_value(Utc::now()).map_err(kvs_error)?);
	let filter = filter!("_id" => auth.user_id.as_str());
	match meta.store.update_one(&kvs::collection::<User>(), &filter, set, true).await? {
		Some(doc) => serde_json::from_value(Value::Object(doc)).map_err(|e| kvs_error(e).into()),
		None => Err(GqlError::ResolverError(format!("User `{}` does not exist", auth.user_id))),
	}
}

async fn add_restricted_email(
	meta: Meta,
	auth: Auth,
	Args(args): Args<AddRestrictedEmail>,
) -> Result<ContactSettings, GqlError> {
	let filter = filter!("_id" => auth.organization_id.as_str());
	let mut settings = match meta.store.find::<ContactSettings>(&filter).await? {
		Some(settings) => settings,
		None => ContactSettings::default_for(&auth.organization_id),
	};
	let email = args.email.to_lowercase();
	if !settings.email.restriction_list.contains(&email) {
		settings.email.restriction_list.push(email);
	}
	Ok(meta.store.update(&filter, &settings).await?)
}

fn kvs_error(e: serde_json::Error) -> neodeliver_core::err::Error {
	neodeliver_core::err::Error::from(e)
}

pub struct Settings;

impl Module for Settings {
	fn register(&self, builder: &mut Builder) {
		builder.query::<User>().filter(current_user).guard(Scope("users:read"));
		builder.query::<Vec<TeamMember>>().filter(active_members);
		builder.query::<ContactSettings>().filter(own_organization);
		builder.query_fn(security_settings);
		builder.mutation(edit_user);
		builder.mutation(add_restricted_email);
	}
}
