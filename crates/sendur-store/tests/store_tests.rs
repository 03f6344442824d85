// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use sendur_store::{
    FileSessionCache, LEADS_CACHE_KEY, MemorySessionCache, SessionCache, evict_stale_sessions,
    read_cached_leads, write_cached_leads,
};
use sendur_testkit::{leads_json, sample_leads, temp_dir};
use std::fs;
use std::thread;
use std::time::Duration;

#[test]
fn memory_cache_misses_until_written() -> Result<()> {
    let mut cache = MemorySessionCache::new();
    assert_eq!(cache.get(LEADS_CACHE_KEY)?, None);
    assert_eq!(read_cached_leads(&cache), None);

    cache.set(LEADS_CACHE_KEY, "[]")?;
    assert_eq!(cache.get(LEADS_CACHE_KEY)?.as_deref(), Some("[]"));
    assert_eq!(read_cached_leads(&cache), Some(Vec::new()));
    Ok(())
}

#[test]
fn raw_body_is_stored_verbatim_and_decodes_back() -> Result<()> {
    let leads = sample_leads(6);
    let raw = leads_json(&leads)?;
    let mut cache = MemorySessionCache::new();

    write_cached_leads(&mut cache, &raw)?;
    assert_eq!(cache.get(LEADS_CACHE_KEY)?, Some(raw));
    assert_eq!(read_cached_leads(&cache), Some(leads));
    Ok(())
}

#[test]
fn undecodable_entry_counts_as_miss() -> Result<()> {
    let mut cache = MemorySessionCache::new();
    cache.set(LEADS_CACHE_KEY, "<html>session expired</html>")?;
    assert_eq!(read_cached_leads(&cache), None);

    cache.set(LEADS_CACHE_KEY, r#"{"leads":[]}"#)?;
    assert_eq!(read_cached_leads(&cache), None);
    Ok(())
}

#[test]
fn file_cache_survives_reopen_of_same_session() -> Result<()> {
    let root = temp_dir()?;
    let leads = sample_leads(3);
    let raw = leads_json(&leads)?;

    {
        let mut cache = FileSessionCache::open(root.path(), "ppid-100")?;
        write_cached_leads(&mut cache, &raw)?;
    }

    let reopened = FileSessionCache::open(root.path(), "ppid-100")?;
    assert_eq!(reopened.get(LEADS_CACHE_KEY)?, Some(raw));
    assert_eq!(read_cached_leads(&reopened), Some(leads));

    let staged: Vec<_> = fs::read_dir(reopened.dir())?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(staged.is_empty(), "staging file left behind");
    Ok(())
}

#[test]
fn file_sessions_are_isolated() -> Result<()> {
    let root = temp_dir()?;
    let mut first = FileSessionCache::open(root.path(), "ppid-1")?;
    let second = FileSessionCache::open(root.path(), "ppid-2")?;

    write_cached_leads(&mut first, &leads_json(&sample_leads(2))?)?;
    assert!(read_cached_leads(&first).is_some());
    assert_eq!(second.get(LEADS_CACHE_KEY)?, None);
    assert_eq!(read_cached_leads(&second), None);
    Ok(())
}

#[test]
fn file_cache_overwrites_existing_entry() -> Result<()> {
    let root = temp_dir()?;
    let mut cache = FileSessionCache::open(root.path(), "work")?;
    cache.set(LEADS_CACHE_KEY, "[]")?;
    let raw = leads_json(&sample_leads(1))?;
    cache.set(LEADS_CACHE_KEY, &raw)?;
    assert_eq!(cache.get(LEADS_CACHE_KEY)?, Some(raw));
    Ok(())
}

#[test]
fn open_rejects_unsafe_session_ids() -> Result<()> {
    let root = temp_dir()?;
    let error = FileSessionCache::open(root.path(), "../escape").expect_err("should reject");
    assert!(error.to_string().contains("may only contain"));
    assert!(!root.path().join("../escape").exists());
    Ok(())
}

#[test]
fn eviction_removes_only_stale_sessions() -> Result<()> {
    let root = temp_dir()?;
    FileSessionCache::open(root.path(), "old")?;
    fs::write(root.path().join("stray.txt"), "not a session")?;
    thread::sleep(Duration::from_millis(60));

    assert_eq!(evict_stale_sessions(root.path(), Duration::from_secs(3600))?, 0);
    assert!(root.path().join("old").exists());

    assert_eq!(evict_stale_sessions(root.path(), Duration::from_millis(20))?, 1);
    assert!(!root.path().join("old").exists());
    assert!(root.path().join("stray.txt").exists());
    Ok(())
}

#[test]
fn reading_a_session_keeps_it_from_eviction() -> Result<()> {
    let root = temp_dir()?;
    let mut active = FileSessionCache::open(root.path(), "active")?;
    write_cached_leads(&mut active, &leads_json(&sample_leads(2))?)?;
    FileSessionCache::open(root.path(), "idle")?;
    thread::sleep(Duration::from_millis(120));

    assert!(read_cached_leads(&active).is_some());
    assert_eq!(evict_stale_sessions(root.path(), Duration::from_millis(60))?, 1);
    assert!(root.path().join("active").exists());
    assert!(!root.path().join("idle").exists());
    assert!(read_cached_leads(&active).is_some());
    Ok(())
}

#[test]
fn zero_ttl_or_missing_root_evicts_nothing() -> Result<()> {
    let root = temp_dir()?;
    FileSessionCache::open(root.path(), "keep")?;
    assert_eq!(evict_stale_sessions(root.path(), Duration::ZERO)?, 0);
    assert!(root.path().join("keep").exists());

    let missing = root.path().join("nope");
    assert_eq!(evict_stale_sessions(&missing, Duration::from_secs(1))?, 0);
    Ok(())
}
