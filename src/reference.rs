//! Idempotent reference resolution used when persisting posts: slug
//! duplicate detection, category find-or-create and post-category linking.
//!
//! None of these take locks. Correctness under concurrent writers comes from
//! the store's uniqueness constraints: a lost insert race surfaces as
//! `StoreError::Conflict` and is treated as "the row already exists".

use rand::{Rng, distributions::Alphanumeric};

use crate::{
    ids::{IdType, new_id},
    models::{Category, PostCategory},
    repository::{Repository, StoreError},
};

const SLUG_SUFFIX_LENGTH: usize = 9;

/// is_slug_duplicate
///
/// True when `user_id` already owns a live post with this non-empty slug.
/// Advisory only; the insert itself is the final arbiter.
pub async fn is_slug_duplicate(
    repo: &dyn Repository,
    slug: &str,
    user_id: &str,
) -> Result<bool, StoreError> {
    if slug.is_empty() {
        return Ok(false);
    }
    Ok(repo.find_post_slug(slug, user_id).await?.is_some())
}

/// normalize_category_names
///
/// Trims every name, drops blanks and collapses duplicates, keeping the
/// first-seen order.
pub fn normalize_category_names(names: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !normalized.iter().any(|n| n == name) {
            normalized.push(name.to_string());
        }
    }
    normalized
}

/// find_or_create_categories
///
/// Returns one row per requested name, creating the missing ones.
///
/// 1. look up the names that already exist,
/// 2. bulk-insert the rest,
/// 3. if the bulk insert lost a race, insert the names one at a time and
///    ignore the ones someone else created,
/// 4. re-read so every caller sees the same committed rows.
pub async fn find_or_create_categories(
    repo: &dyn Repository,
    names: &[String],
) -> Result<Vec<Category>, StoreError> {
    let names = normalize_category_names(names);
    if names.is_empty() {
        return Ok(vec![]);
    }

    let existing = repo.get_categories_by_names(&names).await?;
    let now = chrono::Utc::now().timestamp_millis();
    let missing: Vec<Category> = names
        .iter()
        .filter(|name| !existing.iter().any(|c| &c.name == *name))
        .map(|name| Category {
            id: new_id(IdType::Category),
            name: name.clone(),
            create_at: now,
        })
        .collect();

    if !missing.is_empty() {
        match repo.insert_categories(&missing).await {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                tracing::debug!("category bulk insert lost a race, retrying one by one: {e}");
                for category in &missing {
                    match repo.insert_categories(std::slice::from_ref(category)).await {
                        Ok(()) => {}
                        Err(e) if e.is_conflict() => {
                            tracing::debug!(name = %category.name, "category created concurrently");
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
            Err(e) => return Err(e),
        }
    }

    let resolved = repo.get_categories_by_names(&names).await?;
    if resolved.len() != names.len() {
        tracing::warn!(
            requested = names.len(),
            resolved = resolved.len(),
            "category re-read returned an unexpected number of rows"
        );
    }
    Ok(resolved)
}

/// sync_post_category
///
/// Links a post to a category exactly once.
pub async fn sync_post_category(
    repo: &dyn Repository,
    post_id: &str,
    category_id: &str,
) -> Result<(), StoreError> {
    if repo.get_post_category(post_id, category_id).await?.is_some() {
        return Ok(());
    }

    let link = PostCategory {
        id: new_id(IdType::PostCategory),
        post_id: post_id.to_string(),
        category_id: category_id.to_string(),
    };
    match repo.insert_post_category(&link).await {
        Err(e) if e.is_conflict() => Ok(()),
        other => other,
    }
}

/// slugify
///
/// Lowercases `title` and joins its alphanumeric runs with single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// generate_url_slug
///
/// `slugify(title)` followed by a dash and a random suffix.
pub fn generate_url_slug(title: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_SUFFIX_LENGTH)
        .map(char::from)
        .collect();

    let base = slugify(title);
    if base.is_empty() {
        suffix
    } else {
        format!("{base}-{suffix}")
    }
}
