//! Post visibility and ownership policy.
//!
//! Every listing, detail, and mutation endpoint funnels through the two
//! predicate families defined here: publication-window visibility (what a
//! viewer may see) and ownership authorization (what a viewer may change).
//! Both are pure functions evaluated at read time; nothing here is stored.

use time::OffsetDateTime;
use uuid::Uuid;

/// The identity a request carries, resolved from the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(Uuid),
}

impl Viewer {
    pub fn user_id(self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(id),
        }
    }

    /// True when the viewer is the referenced user.
    pub fn is(self, user_id: Uuid) -> bool {
        matches!(self, Viewer::User(id) if id == user_id)
    }
}

/// The visibility-relevant slice of a post row.
///
/// `category_published` is `None` for uncategorized posts; an unpublished
/// category hides every post under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostVisibility {
    pub is_published: bool,
    pub pub_date: OffsetDateTime,
    pub category_published: Option<bool>,
}

impl PostVisibility {
    /// Public visibility: published flag set, publication timestamp elapsed,
    /// and the category (when present) published.
    pub fn public_at(&self, now: OffsetDateTime) -> bool {
        self.is_published && self.pub_date <= now && self.category_published.unwrap_or(true)
    }
}

/// Outcome of an authorization predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Access::Allow)
    }

    fn when(condition: bool) -> Self {
        if condition { Access::Allow } else { Access::Deny }
    }
}

/// May the viewer see this post at all? Owners always see their own posts;
/// everyone else is held to the public-visibility window.
pub fn can_view_post(
    viewer: Viewer,
    author_id: Uuid,
    visibility: PostVisibility,
    now: OffsetDateTime,
) -> bool {
    viewer.is(author_id) || visibility.public_at(now)
}

/// Posts are mutated only by their author.
pub fn can_edit_post(viewer: Viewer, author_id: Uuid) -> Access {
    Access::when(viewer.is(author_id))
}

pub fn can_delete_post(viewer: Viewer, author_id: Uuid) -> Access {
    can_edit_post(viewer, author_id)
}

/// Comments are mutated and deleted only by their author.
pub fn can_edit_comment(viewer: Viewer, author_id: Uuid) -> Access {
    Access::when(viewer.is(author_id))
}

/// A profile is public but editable only by its owner.
pub fn can_edit_profile(viewer: Viewer, profile_user_id: Uuid) -> Access {
    Access::when(viewer.is(profile_user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn visible(is_published: bool, offset: Duration, category: Option<bool>) -> PostVisibility {
        PostVisibility {
            is_published,
            pub_date: OffsetDateTime::now_utc() + offset,
            category_published: category,
        }
    }

    #[test]
    fn published_past_post_is_public() {
        let now = OffsetDateTime::now_utc();
        assert!(visible(true, Duration::hours(-1), None).public_at(now));
        assert!(visible(true, Duration::hours(-1), Some(true)).public_at(now));
    }

    #[test]
    fn unpublished_post_is_hidden() {
        let now = OffsetDateTime::now_utc();
        assert!(!visible(false, Duration::hours(-1), None).public_at(now));
    }

    #[test]
    fn future_dated_post_is_hidden_until_due() {
        let now = OffsetDateTime::now_utc();
        assert!(!visible(true, Duration::days(1), None).public_at(now));
        assert!(visible(true, Duration::days(1), None).public_at(now + Duration::days(2)));
    }

    #[test]
    fn unpublished_category_hides_post() {
        let now = OffsetDateTime::now_utc();
        assert!(!visible(true, Duration::hours(-1), Some(false)).public_at(now));
    }

    #[test]
    fn owner_always_views_own_future_post() {
        let now = OffsetDateTime::now_utc();
        let author = Uuid::new_v4();
        let post = visible(true, Duration::days(1), None);

        assert!(can_view_post(Viewer::User(author), author, post, now));
        assert!(!can_view_post(Viewer::Anonymous, author, post, now));
        assert!(!can_view_post(Viewer::User(Uuid::new_v4()), author, post, now));
    }

    #[test]
    fn only_author_may_mutate() {
        let author = Uuid::new_v4();

        assert!(can_edit_post(Viewer::User(author), author).is_allowed());
        assert!(!can_edit_post(Viewer::User(Uuid::new_v4()), author).is_allowed());
        assert!(!can_edit_post(Viewer::Anonymous, author).is_allowed());
        assert!(!can_delete_post(Viewer::Anonymous, author).is_allowed());
        assert!(!can_edit_comment(Viewer::Anonymous, author).is_allowed());
        assert!(can_edit_profile(Viewer::User(author), author).is_allowed());
    }
}
