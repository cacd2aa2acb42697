//! Contacts, and the tags and segments they are organised in.

use chrono::{DateTime, Utc};
use neodeliver_core::filter;
use neodeliver_core::gql::{Args, Builder, ById, Field, GqlError, Meta, Module, Record};
use neodeliver_core::iam::Auth;
use neodeliver_core::kvs::{Document, Filter, filter as filters};
use serde::{Deserialize, Serialize};

use super::{by_organization, new_id};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
	#[serde(rename = "_id")]
	pub id: String,
	pub organization_id: String,
	pub given_name: String,
	pub last_name: String,
	pub email: String,
	pub notification_tokens: Vec<String>,
	pub phone_number: String,
	pub status: String,
	pub subscribed_at: Option<DateTime<Utc>>,
	pub lang: String,
	pub stats: ContactStats,
}

impl Record for Contact {
	const NAME: &'static str = "Contact";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<String>("_id").rename("id"),
			Field::new::<String>("organization_id"),
			Field::new::<String>("given_name"),
			Field::new::<String>("last_name"),
			Field::new::<String>("email"),
			Field::new::<Vec<String>>("notification_tokens"),
			Field::new::<String>("phone_number"),
			Field::new::<String>("status"),
			Field::new::<Option<DateTime<Utc>>>("subscribed_at"),
			Field::new::<String>("lang"),
			Field::new::<ContactStats>("stats"),
		]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactStats {
	pub sms: ContactStatsItem,
	pub email: ContactStatsItem,
	pub notifications: ContactStatsItem,
}

impl Record for ContactStats {
	const NAME: &'static str = "ContactStats";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<ContactStatsItem>("sms"),
			Field::new::<ContactStatsItem>("email"),
			Field::new::<ContactStatsItem>("notifications"),
		]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactStatsItem {
	pub campaigns_sent: i64,
	pub last_campaign_sent: Option<DateTime<Utc>>,
	pub messages_opened: i64,
	pub last_message_opened: Option<DateTime<Utc>>,
	pub messages_clicked: i64,
	pub last_message_clicked: Option<DateTime<Utc>>,
}

impl Record for ContactStatsItem {
	const NAME: &'static str = "ContactStatsItem";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<i64>("campaigns_sent"),
			Field::new::<Option<DateTime<Utc>>>("last_campaign_sent"),
			Field::new::<i64>("messages_opened"),
			Field::new::<Option<DateTime<Utc>>>("last_message_opened"),
			Field::new::<i64>("messages_clicked"),
			Field::new::<Option<DateTime<Utc>>>("last_message_clicked"),
		]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tag {
	#[serde(rename = "_id")]
	pub id: String,
	pub organization_id: String,
	pub name: String,
	pub contacts_count: i64,
	pub created_at: Option<DateTime<Utc>>,
}

impl Record for Tag {
	const NAME: &'static str = "Tag";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<String>("_id").rename("id"),
			Field::new::<String>("organization_id"),
			Field::new::<String>("name"),
			Field::new::<i64>("contacts_count"),
			Field::new::<Option<DateTime<Utc>>>("created_at"),
		]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Segment {
	#[serde(rename = "_id")]
	pub id: String,
	pub organization_id: String,
	pub opens_count: i64,
	pub click_rate: i64,
	pub mails_sent_count: i64,
	pub created_at: Option<DateTime<Utc>>,
	#[serde(flatten)]
	pub data: SegmentData,
}

impl Record for Segment {
	const NAME: &'static str = "Segment";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<String>("_id").rename("id"),
			Field::new::<String>("organization_id"),
			Field::new::<i64>("opens_count"),
			Field::new::<i64>("click_rate"),
			Field::new::<i64>("mails_sent_count").rename("mail_sent_count"),
			Field::new::<Option<DateTime<Utc>>>("created_at"),
			Field::embed::<SegmentData>("data"),
		]
	}
}

/// The editable part of a segment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentData {
	pub name: Option<String>,
	/// A document filter selecting the contacts of the segment
	pub filters: Option<String>,
	pub subscription: Option<i64>,
}

impl Record for SegmentData {
	const NAME: &'static str = "SegmentData";

	fn fields() -> Vec<Field> {
		vec![
			Field::new::<Option<String>>("name").max_len(150),
			Field::new::<Option<String>>("filters").describe("A JSON document filter selecting the contacts"),
			Field::new::<Option<i64>>("subscription").min(0.0),
		]
	}
}

impl SegmentData {
	/// Checks the filter of the segment is a usable document filter.
	fn validate(&self) -> Result<(), GqlError> {
		let Some(filters) = self.filters.as_deref() else {
			return Ok(());
		};
		let parsed: Filter = serde_json::from_str(filters)
			.map_err(|_| GqlError::ValidationError("Filter query is not valid".to_owned()))?;
		filters::matches(&Document::new(), &parsed)
			.map_err(|_| GqlError::ValidationError("Filter query is not valid".to_owned()))?;
		Ok(())
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewTag {
	pub name: String,
}

impl Record for NewTag {
	const NAME: &'static str = "NewTag";

	fn fields() -> Vec<Field> {
		vec![Field::new::<String>("name").required().max_len(64)]
	}
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentEdit {
	pub id: String,
	pub data: SegmentData,
}

impl Record for SegmentEdit {
	const NAME: &'static str = "SegmentEdit";

	fn fields() -> Vec<Field> {
		vec![Field::new::<String>("id").required(), Field::new::<SegmentData>("data").required()]
	}
}

/// Selects one contact of the caller's organization.
async fn contact_filter(auth: Auth, Args(by): Args<ById>) -> Filter {
	filter!("_id" => by.id, "organization_id" => auth.organization_id)
}

async fn create_tag(meta: Meta, auth: Auth, Args(args): Args<NewTag>) -> Result<Tag, GqlError> {
	let tag = Tag {
		id: new_id("tag"),
		organization_id: auth.organization_id,
		name: args.name,
		contacts_count: 0,
		created_at: Some(Utc::now()),
	};
	meta.store.save(&tag).await?;
	Ok(tag)
}

async fn delete_tag(meta: Meta, auth: Auth, Args(by): Args<ById>) -> Result<bool, GqlError> {
	let filter = filter!("_id" => by.id, "organization_id" => auth.organization_id);
	Ok(meta.store.delete::<Tag>(&filter).await?)
}

async fn create_segment(
	meta: Meta,
	auth: Auth,
	Args(data): Args<SegmentData>,
) -> Result<Segment, GqlError> {
	data.validate()?;
	let segment = Segment {
		id: new_id("sgt"),
		organization_id: auth.organization_id,
		opens_count: 0,
		click_rate: 0,
		mails_sent_count: 0,
		created_at: Some(Utc::now()),
		data,
	};
	meta.store.save(&segment).await?;
	Ok(segment)
}

async fn update_segment(
	meta: Meta,
	auth: Auth,
	Args(edit): Args<SegmentEdit>,
) -> Result<Segment, GqlError> {
	edit.data.validate()?;
	let filter = filter!("_id" => edit.id.as_str(), "organization_id" => auth.organization_id);
	// Only the members which were passed are updated
	let mut set = neodeliver_core::kvs::to_document(&edit.data)?;
	set.retain(|_, v| !v.is_null());
	if set.is_empty() {
		return Err(GqlError::ArgumentError("no data to update".to_owned()));
	}
	let collection = neodeliver_core::kvs::collection::<Segment>();
	match meta.store.update_one(&collection, &filter, set, false).await? {
		Some(doc) => Ok(serde_json::from_value(serde_json::Value::Object(doc))
			.map_err(neodeliver_core::err::Error::from)?),
		None => Err(GqlError::ResolverError(format!("Segment `{}` does not exist", edit.id))),
	}
}

async fn delete_segment(meta: Meta, auth: Auth, Args(by): Args<ById>) -> Result<bool, GqlError> {
	let filter = filter!("_id" => by.id, "organization_id" => auth.organization_id);
	Ok(meta.store.delete::<Segment>(&filter).await?)
}

pub struct Contacts;

impl Module for Contacts {
	fn register(&self, builder: &mut Builder) {
		builder.query::<Contact>().filter(contact_filter);
		builder.query::<Vec<Contact>>().filter(by_organization);
		builder.query::<Vec<Tag>>().filter(by_organization);
		builder.query::<Vec<Segment>>().filter(by_organization);
		builder.mutation(create_tag);
		builder.mutation(delete_tag);
		builder.mutation(create_segment);
		builder.mutation(update_segment);
		builder.mutation(delete_segment);
	}
}
