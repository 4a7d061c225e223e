use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use super::{Repository, StoreError};
use crate::models::{Category, Post, PostCategory, Team, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    teams: HashMap<String, Team>,
    posts: Vec<Post>,
    categories: Vec<Category>,
    post_categories: Vec<PostCategory>,
}

/// MemoryRepository
///
/// In-process `Repository` holding every table behind one mutex. Uniqueness
/// rules mirror the Postgres schema, including the live-row scope of the
/// username, email and slug constraints.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn find_live_user(
        &self,
        matches: impl Fn(&User) -> bool,
    ) -> Result<Option<User>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .iter()
            .find(|u| u.delete_at == 0 && matches(u))
            .cloned())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn migrate(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.find_live_user(|u| u.id == id)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.find_live_user(|u| u.username == username)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_live_user(|u| u.email == email)
    }

    async fn get_registered_user_count(&self) -> Result<i64, StoreError> {
        let tables = self.lock()?;
        Ok(tables.users.iter().filter(|u| u.delete_at == 0).count() as i64)
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        insert_live_user(&mut *tables, user)
    }

    async fn create_first_user(&self, user: &User) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        if tables.users.iter().any(|u| u.delete_at == 0) {
            return Ok(false);
        }
        insert_live_user(&mut *tables, user)?;
        Ok(true)
    }

    async fn soft_delete_user(&self, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        let now = chrono::Utc::now().timestamp_millis();
        match tables
            .users
            .iter_mut()
            .find(|u| u.id == id && u.delete_at == 0)
        {
            Some(user) => {
                user.delete_at = now;
                user.update_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_team(&self, id: &str) -> Result<Option<Team>, StoreError> {
        Ok(self.lock()?.teams.get(id).cloned())
    }

    async fn upsert_team_signup_token(&self, team: &Team) -> Result<(), StoreError> {
        self.lock()?.teams.insert(team.id.clone(), team.clone());
        Ok(())
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.id == id && p.delete_at == 0)
            .cloned())
    }

    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let taken = tables
            .posts
            .iter()
            .any(|p| p.delete_at == 0 && p.user_id == post.user_id && p.slug == post.slug);
        if taken {
            return Err(StoreError::Conflict("posts_user_slug_live_key".into()));
        }
        let mut row = post.clone();
        row.categories.clear();
        tables.posts.push(row);
        Ok(())
    }

    async fn find_post_slug(
        &self,
        slug: &str,
        user_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .posts
            .iter()
            .find(|p| {
                p.delete_at == 0 && !p.slug.is_empty() && p.user_id == user_id && p.slug == slug
            })
            .map(|p| p.slug.clone()))
    }

    async fn get_categories_by_names(
        &self,
        names: &[String],
    ) -> Result<Vec<Category>, StoreError> {
        let tables = self.lock()?;
        let mut found: Vec<Category> = tables
            .categories
            .iter()
            .filter(|c| names.contains(&c.name))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn insert_categories(&self, categories: &[Category]) -> Result<(), StoreError> {
        let mut tables = self.lock()?;

        for (i, category) in categories.iter().enumerate() {
            let clash = tables.categories.iter().any(|c| c.name == category.name)
                || categories[..i].iter().any(|c| c.name == category.name);
            if clash {
                return Err(StoreError::Conflict("categories_name_key".into()));
            }
        }
        tables.categories.extend_from_slice(categories);
        Ok(())
    }

    async fn get_categories_for_post(&self, post_id: &str) -> Result<Vec<Category>, StoreError> {
        let tables = self.lock()?;
        let mut linked: Vec<Category> = tables
            .post_categories
            .iter()
            .filter(|pc| pc.post_id == post_id)
            .filter_map(|pc| tables.categories.iter().find(|c| c.id == pc.category_id))
            .cloned()
            .collect();
        linked.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(linked)
    }

    async fn get_post_category(
        &self,
        post_id: &str,
        category_id: &str,
    ) -> Result<Option<PostCategory>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .post_categories
            .iter()
            .find(|pc| pc.post_id == post_id && pc.category_id == category_id)
            .cloned())
    }

    async fn insert_post_category(&self, link: &PostCategory) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let exists = tables
            .post_categories
            .iter()
            .any(|pc| pc.post_id == link.post_id && pc.category_id == link.category_id);
        if exists {
            return Err(StoreError::Conflict("post_categories_pair_key".into()));
        }
        tables.post_categories.push(link.clone());
        Ok(())
    }
}

fn insert_live_user(tables: &mut Tables, user: &User) -> Result<(), StoreError> {
    for existing in tables.users.iter().filter(|u| u.delete_at == 0) {
        if existing.username == user.username {
            return Err(StoreError::Conflict("users_username_live_key".into()));
        }
        if existing.email == user.email {
            return Err(StoreError::Conflict("users_email_live_key".into()));
        }
    }
    tables.users.push(user.clone());
    Ok(())
}
