use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Ability {
    ViewThreads,
    ViewPosts,
    CreateThread,
    ReplyThread,
    EditOwnThread,
    EditOthersThread,
    ApprovePosts,
    ViewTrashed,
    HidePosts,
    InsertAttachment,
    InsertImage,
    InsertAudio,
    InsertVideo,
    InsertReward,
    CreateDialog,
}

/// A permission held by a user. A grant without a category applies everywhere.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Grant {
    pub ability: Ability,
    pub category_id: Option<String>,
}

impl Grant {
    pub fn global(ability: Ability) -> Self {
        Grant {
            ability,
            category_id: None,
        }
    }

    pub fn in_category(ability: Ability, category_id: &str) -> Self {
        Grant {
            ability,
            category_id: Some(category_id.to_string()),
        }
    }

    fn covers(&self, ability: Ability, category_id: Option<&str>) -> bool {
        if self.ability != ability {
            return false;
        }
        match (&self.category_id, category_id) {
            (None, _) => true,
            (Some(granted), Some(wanted)) => granted == wanted,
            (Some(_), None) => false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub grants: Vec<Grant>,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Grants every newly registered member starts with.
pub fn member_grants() -> Vec<Grant> {
    vec![
        Grant::global(Ability::ViewThreads),
        Grant::global(Ability::ViewPosts),
        Grant::global(Ability::CreateThread),
        Grant::global(Ability::ReplyThread),
        Grant::global(Ability::EditOwnThread),
        Grant::global(Ability::InsertImage),
        Grant::global(Ability::InsertAttachment),
        Grant::global(Ability::CreateDialog),
    ]
}

fn guest_grants() -> Vec<Grant> {
    vec![Grant::global(Ability::ViewThreads), Grant::global(Ability::ViewPosts)]
}

/// The identity a request is served for.
#[derive(Clone, Debug)]
pub struct Actor {
    user_id: Option<String>,
    grants: Vec<Grant>,
}

impl Actor {
    pub fn guest() -> Self {
        Actor {
            user_id: None,
            grants: guest_grants(),
        }
    }

    pub fn user(user: &User) -> Self {
        Actor {
            user_id: Some(user.id.clone()),
            grants: user.grants.clone(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn is(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }

    pub fn can(&self, ability: Ability) -> bool {
        self.grants.iter().any(|g| g.covers(ability, None))
    }

    pub fn can_in(&self, ability: Ability, category_id: &str) -> bool {
        self.grants.iter().any(|g| g.covers(ability, Some(category_id)))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id.clone(),
            username: user.username.clone(),
        }
    }
}
