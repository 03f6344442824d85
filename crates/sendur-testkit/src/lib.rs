// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod mock;

use anyhow::{Context, Result};
use sendur_app::{Lead, LeadId};

pub use mock::{MockResponse, MockServer, RecordedRequest};

const TRADES: [&str; 12] = [
    "Bakery",
    "Plumbing",
    "Barber",
    "Florist",
    "Auto Repair",
    "Tailor",
    "Diner",
    "Hardware",
    "Laundromat",
    "Pet Grooming",
    "Bookshop",
    "Upholstery",
];

const ADJECTIVES: [&str; 12] = [
    "Maple", "Corner", "Sunrise", "Main Street", "Golden", "Riverside", "Oak", "Family", "Old Town",
    "Bluebird", "Hometown", "Lucky",
];

const SUFFIXES: [&str; 5] = ["& Sons", "Co", "Shop", "House", "Works"];

const CITIES: [&str; 14] = [
    "Austin",
    "Seattle",
    "Denver",
    "Madison",
    "Raleigh",
    "Pittsburgh",
    "Portland",
    "Boise",
    "Phoenix",
    "Nashville",
    "Columbus",
    "Minneapolis",
    "Omaha",
    "Tucson",
];

const AREA_CODES: [u16; 8] = [512, 206, 303, 608, 919, 412, 503, 208];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn chance(&mut self, percent: usize) -> bool {
        self.int_n(100) < percent
    }
}

/// Seeded generator of realistic small-business leads. Identical seeds yield
/// identical leads; identifiers stay unique within one faker.
#[derive(Debug, Clone)]
pub struct LeadFaker {
    rng: DeterministicRng,
    issued: u64,
}

impl LeadFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            issued: 0,
        }
    }

    pub fn lead(&mut self) -> Lead {
        self.issued += 1;
        let id = format!("{:08x}{:016x}", self.issued, self.rng.next_u64());

        let business_name = format!(
            "{} {} {}",
            self.pick(&ADJECTIVES),
            self.pick(&TRADES),
            self.pick(&SUFFIXES)
        );
        let slug: String = business_name
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();
        let city = self.pick(&CITIES);
        let area_code = AREA_CODES[self.rng.int_n(AREA_CODES.len())];
        let phone = format!("({area_code}) 555-{:04}", self.rng.int_n(10_000));

        let email = self
            .rng
            .chance(80)
            .then(|| format!("owner@{slug}.example"));
        let email_draft = email.as_ref().map(|_| {
            format!("Hi {business_name} team, we help {city} businesses get online.")
        });
        let website = self.rng.chance(15).then(|| format!("https://{slug}.example"));

        Lead {
            id: LeadId::new(id),
            business_name: Some(business_name),
            phone: Some(phone),
            email,
            city: Some(city.to_owned()),
            website,
            email_draft,
            have_contacted: self.rng.chance(30),
        }
    }

    pub fn leads(&mut self, count: usize) -> Vec<Lead> {
        (0..count).map(|_| self.lead()).collect()
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }
}

/// `count` leads from a fixed seed.
pub fn sample_leads(count: usize) -> Vec<Lead> {
    LeadFaker::new(7).leads(count)
}

/// Serializes leads the way the backend's find-all endpoint does.
pub fn leads_json(leads: &[Lead]) -> Result<String> {
    serde_json::to_string(leads).context("encode leads fixture")
}

pub fn temp_dir() -> Result<tempfile::TempDir> {
    tempfile::tempdir().context("create temp dir")
}
