//! Route prompts and the JSON shapes the model must return.

use serde::{Deserialize, Serialize};

/// Contact fields recovered from card text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization: Option<String>,
    pub job_title: Option<String>,
    pub email_addresses: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub websites: Vec<String>,
    pub address: Option<String>,
    pub note: String,
}

/// Short B2B description of the card's company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub summary: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

pub fn parse_prompt(card_text: &str) -> String {
    format!(
        r#"You are an OCR clean-up and data-entry assistant.
Analyse the raw text of a business card or e-mail signature below.
Keep Polish diacritics; restore missing ones where the word is clearly Polish
(e.g. "Wieclawska" -> "Więcławska", "Lodz" -> "Łódź").

Input:
"""
{card_text}
"""

Rules:
1. Fix obvious OCR mistakes (e.g. "Emall" -> "Email").
2. Format phone numbers as +48 XXX XXX XXX where applicable.
3. Split first name from last name.
4. Ignore NIP/REGON numbers when looking for the company name unless nothing else is present.

Return bare JSON (no Markdown):
{{
  "firstName": string | null,
  "lastName": string | null,
  "organization": string | null,
  "jobTitle": string | null,
  "emailAddresses": string[],
  "phoneNumbers": string[],
  "websites": string[],
  "address": string | null,
  "note": ""
}}"#
    )
}

pub fn enrich_prompt(context: &str) -> String {
    format!(
        r#"Using the company data below, write a short professional B2B profile.

DATA:
"""
{context}
"""

TASK:
1. Summarise in 2-3 sentences, in Polish, what the company does.
2. Name the industry.
3. Give the location (city/country) if the data mentions it.

Return bare JSON:
{{
  "summary": "...",
  "industry": "e.g. IT / Construction",
  "location": "e.g. Warszawa, Polska"
}}"#
    )
}
