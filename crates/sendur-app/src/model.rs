// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::LeadId;

/// A prospective business contact as served by `/sendur/api/leads/find-all`.
///
/// Text fields are nullable on the server side, so each one is optional here
/// and survives a serialize round trip as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(rename = "_id")]
    pub id: LeadId,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub email_draft: Option<String>,
    #[serde(default)]
    pub have_contacted: bool,
}

impl Lead {
    pub fn value(&self, field: LeadField) -> FieldValue<'_> {
        match field {
            LeadField::Id => FieldValue::Text(Some(self.id.as_str())),
            LeadField::BusinessName => FieldValue::Text(self.business_name.as_deref()),
            LeadField::Phone => FieldValue::Text(self.phone.as_deref()),
            LeadField::Email => FieldValue::Text(self.email.as_deref()),
            LeadField::City => FieldValue::Text(self.city.as_deref()),
            LeadField::Website => FieldValue::Text(self.website.as_deref()),
            LeadField::EmailDraft => FieldValue::Text(self.email_draft.as_deref()),
            LeadField::HaveContacted => FieldValue::Flag(self.have_contacted),
        }
    }

    pub fn display(&self, field: LeadField) -> String {
        self.value(field).display()
    }
}

/// A borrowed field value. Absent text orders before any present text and
/// `false` orders before `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldValue<'a> {
    Text(Option<&'a str>),
    Flag(bool),
}

impl FieldValue<'_> {
    pub fn display(self) -> String {
        match self {
            Self::Text(value) => value.unwrap_or_default().to_owned(),
            Self::Flag(true) => "Yes".to_owned(),
            Self::Flag(false) => "No".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadField {
    Id,
    BusinessName,
    Phone,
    Email,
    City,
    Website,
    EmailDraft,
    HaveContacted,
}

impl LeadField {
    /// Columns shown in the table, in header order. The identifier is
    /// sortable but never rendered.
    pub const COLUMNS: [Self; 7] = [
        Self::BusinessName,
        Self::Phone,
        Self::Email,
        Self::City,
        Self::Website,
        Self::EmailDraft,
        Self::HaveContacted,
    ];

    /// Wire name, identical to the JSON property.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "_id",
            Self::BusinessName => "businessName",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::City => "city",
            Self::Website => "website",
            Self::EmailDraft => "emailDraft",
            Self::HaveContacted => "haveContacted",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::BusinessName => "Business Name",
            Self::Phone => "Phone",
            Self::Email => "Email",
            Self::City => "City",
            Self::Website => "Website",
            Self::EmailDraft => "Email Draft",
            Self::HaveContacted => "Have Contacted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "_id" | "id" => Some(Self::Id),
            "businessName" | "business_name" => Some(Self::BusinessName),
            "phone" => Some(Self::Phone),
            "email" => Some(Self::Email),
            "city" => Some(Self::City),
            "website" => Some(Self::Website),
            "emailDraft" | "email_draft" => Some(Self::EmailDraft),
            "haveContacted" | "have_contacted" => Some(Self::HaveContacted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Row padding mode. Heights are the pixel sizes the web table used and are
/// kept so padding height stays comparable across front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Density {
    #[default]
    Normal,
    Dense,
}

impl Density {
    pub const NORMAL_ROW_HEIGHT_PX: u32 = 53;
    pub const DENSE_ROW_HEIGHT_PX: u32 = 33;

    pub const fn row_height_px(self) -> u32 {
        match self {
            Self::Normal => Self::NORMAL_ROW_HEIGHT_PX,
            Self::Dense => Self::DENSE_ROW_HEIGHT_PX,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Normal => Self::Dense,
            Self::Dense => Self::Normal,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Dense => "dense",
        }
    }
}
