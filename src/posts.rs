use thiserror::Error;

use crate::{
    ids::{IdType, new_id},
    models::{CreatePostRequest, Post},
    reference::{
        find_or_create_categories, generate_url_slug, is_slug_duplicate,
        normalize_category_names, sync_post_category,
    },
    repository::{Repository, StoreError},
};

pub const MAX_POST_CATEGORIES: usize = 5;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("the title is empty")]
    EmptyTitle,
    #[error("the content is empty")]
    EmptyContent,
    #[error("a post can have at most 5 categories, got {0}")]
    TooManyCategories(usize),
    #[error("post {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// create_post
///
/// Persists a post owned by `user_id`. An empty or already-used slug is
/// replaced by one generated from the title; categories are found or created
/// and linked once each. If the insert still loses a slug race, the slug is
/// regenerated and the insert retried once.
pub async fn create_post(
    repo: &dyn Repository,
    request: CreatePostRequest,
    user_id: &str,
) -> Result<Post, PostError> {
    if request.title.trim().is_empty() {
        return Err(PostError::EmptyTitle);
    }
    if request.content.is_empty() {
        return Err(PostError::EmptyContent);
    }

    let category_names = normalize_category_names(&request.categories);
    if category_names.len() > MAX_POST_CATEGORIES {
        return Err(PostError::TooManyCategories(category_names.len()));
    }

    let requested_slug = request.slug.trim();
    let slug = if requested_slug.is_empty() {
        generate_url_slug(&request.title)
    } else if is_slug_duplicate(repo, requested_slug, user_id).await? {
        tracing::debug!(slug = requested_slug, "slug already used, regenerating");
        generate_url_slug(&request.title)
    } else {
        requested_slug.to_string()
    };

    let categories = find_or_create_categories(repo, &category_names).await?;

    let now = chrono::Utc::now().timestamp_millis();
    let mut post = Post {
        id: new_id(IdType::Post),
        title: request.title,
        slug,
        sub_title: request.sub_title,
        content: request.content,
        categories: categories.iter().map(|c| c.name.clone()).collect(),
        publishing_at: request.publishing_at,
        cover_image: request.cover_image,
        disabled_comment: request.disabled_comment,
        user_id: user_id.to_string(),
        create_at: now,
        update_at: now,
        delete_at: 0,
    };

    match repo.insert_post(&post).await {
        Ok(()) => {}
        Err(e) if e.is_conflict() => {
            tracing::debug!(slug = %post.slug, "slug taken at insert, regenerating: {e}");
            post.slug = generate_url_slug(&post.title);
            repo.insert_post(&post).await?;
        }
        Err(e) => return Err(e.into()),
    }

    for category in &categories {
        sync_post_category(repo, &post.id, &category.id).await?;
    }

    tracing::info!(post_id = %post.id, slug = %post.slug, "post created");
    Ok(post)
}

/// get_post
///
/// Loads a live post with its category names.
pub async fn get_post(repo: &dyn Repository, post_id: &str) -> Result<Post, PostError> {
    let mut post = repo
        .get_post(post_id)
        .await?
        .ok_or_else(|| PostError::NotFound(post_id.to_string()))?;

    post.categories = repo
        .get_categories_for_post(&post.id)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();
    Ok(post)
}
