use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;

use tessera_core::{
    can_read_group, group_matches_search, AccessLevel, Author, CreateNoteRequest, Discussion,
    Error, Group, GroupPolicy, GroupRepository, GroupScope, GroupSummary, ListGroupsRequest, Note,
    NotePermissions, NoteRepository, NoteType, NoteableRef, Paginated, Result, User,
    UserRepository, Visibility,
};

/// In-memory stand-in for every repository the API depends on.
pub struct FakeStore {
    pub users: Mutex<Vec<User>>,
    pub tokens: Mutex<HashMap<String, i64>>,
    pub groups: Mutex<Vec<Group>>,
    pub members: Mutex<Vec<(i64, i64)>>,
    pub notes: Mutex<Vec<Note>>,
    pub update_calls: AtomicI64,
    next_id: AtomicI64,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            tokens: Mutex::new(HashMap::new()),
            groups: Mutex::new(Vec::new()),
            members: Mutex::new(Vec::new()),
            notes: Mutex::new(Vec::new()),
            update_calls: AtomicI64::new(0),
            next_id: AtomicI64::new(1),
        }
    }
}

fn epoch(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

impl FakeStore {
    /// Token accepted for `username` by `find_by_token`.
    pub fn token_for(username: &str) -> String {
        format!("token-{}", username)
    }

    pub async fn add_user(&self, username: &str, admin: bool) -> User {
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            username: username.to_string(),
            name: username.to_string(),
            admin,
        };
        self.users.lock().await.push(user.clone());
        self.tokens
            .lock()
            .await
            .insert(Self::token_for(username), user.id);
        user
    }

    pub async fn add_named_user(&self, username: &str, name: &str) -> User {
        let mut user = self.add_user(username, false).await;
        user.name = name.to_string();
        let mut users = self.users.lock().await;
        if let Some(stored) = users.iter_mut().find(|u| u.id == user.id) {
            stored.name = name.to_string();
        }
        user
    }

    /// Groups get `created_at` from their id and `updated_at` in reverse, so
    /// created and activity orders differ.
    pub async fn add_group(
        &self,
        id: i64,
        name: &str,
        visibility: Visibility,
        parent_id: Option<i64>,
    ) -> Group {
        let group = Group {
            id,
            name: name.to_string(),
            path: name.to_lowercase().replace(' ', "-"),
            description: None,
            visibility,
            parent_id,
            created_at_utc: epoch(id),
            updated_at_utc: epoch(1_000 - id),
        };
        self.groups.lock().await.push(group.clone());
        group
    }

    pub async fn add_member(&self, group_id: i64, user_id: i64) {
        self.members.lock().await.push((group_id, user_id));
    }

    pub async fn add_note(
        &self,
        noteable: NoteableRef,
        author: &User,
        text: &str,
        discussion_id: Option<&str>,
    ) -> Note {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let note = Note {
            id,
            discussion_id: discussion_id
                .map(str::to_string)
                .unwrap_or_else(|| format!("d{}", id)),
            note_type: if discussion_id.is_some() {
                NoteType::DiscussionNote
            } else {
                NoteType::Note
            },
            noteable_type: noteable.noteable_type,
            noteable_id: noteable.noteable_id,
            author: Author::from(author),
            note: text.to_string(),
            note_html: format!("<p>{}</p>", text),
            created_at: epoch(id),
            updated_at: epoch(id),
            current_user: NotePermissions::default(),
        };
        self.notes.lock().await.push(note.clone());
        note
    }

    async fn member_of_hierarchy(&self, group_id: i64, user_id: i64) -> bool {
        let groups = self.groups.lock().await;
        let members = self.members.lock().await;
        let mut current = Some(group_id);
        while let Some(id) = current {
            if members.contains(&(id, user_id)) {
                return true;
            }
            current = groups.iter().find(|g| g.id == id).and_then(|g| g.parent_id);
        }
        false
    }

    async fn summarize(&self, group: Group, viewer_id: i64) -> GroupSummary {
        let groups = self.groups.lock().await;
        let members = self.members.lock().await;

        let mut paths = vec![group.path.clone()];
        let mut names = vec![group.name.clone()];
        let mut parent = group.parent_id;
        while let Some(pid) = parent {
            match groups.iter().find(|g| g.id == pid) {
                Some(p) => {
                    paths.push(p.path.clone());
                    names.push(p.name.clone());
                    parent = p.parent_id;
                }
                None => break,
            }
        }
        paths.reverse();
        names.reverse();

        GroupSummary {
            children_count: groups
                .iter()
                .filter(|g| g.parent_id == Some(group.id))
                .count() as i64,
            access_level: members
                .contains(&(group.id, viewer_id))
                .then_some(AccessLevel::Developer),
            full_path: paths.join("/"),
            full_name: names.join(" / "),
            group,
        }
    }
}

#[async_trait]
impl GroupRepository for FakeStore {
    async fn find(&self, id: i64) -> Result<Option<Group>> {
        Ok(self.groups.lock().await.iter().find(|g| g.id == id).cloned())
    }

    async fn list(
        &self,
        scope: &GroupScope,
        req: &ListGroupsRequest,
    ) -> Result<Paginated<GroupSummary>> {
        let all = self.groups.lock().await.clone();
        let mut visible = Vec::new();
        let viewer_id = match scope {
            GroupScope::Memberships { user_id } => {
                let members = self.members.lock().await.clone();
                visible.extend(
                    all.into_iter()
                        .filter(|g| members.contains(&(g.id, *user_id))),
                );
                *user_id
            }
            GroupScope::Children { parent_id, viewer } => {
                for g in all.into_iter().filter(|g| g.parent_id == Some(*parent_id)) {
                    let member = self.member_of_hierarchy(g.id, viewer.id).await;
                    if can_read_group(Some(viewer), &g, member) {
                        visible.push(g);
                    }
                }
                viewer.id
            }
        };

        if let Some(term) = req.search_term() {
            visible.retain(|g| group_matches_search(g, term));
        }
        visible.sort_by(|a, b| req.sort.compare(a, b));

        let mut summaries = Vec::with_capacity(visible.len());
        for g in visible {
            summaries.push(self.summarize(g, viewer_id).await);
        }
        Ok(Paginated::from_sorted(summaries, req.page))
    }
}

#[async_trait]
impl GroupPolicy for FakeStore {
    async fn can_read_group(&self, user: &User, group: &Group) -> Result<bool> {
        let member = self.member_of_hierarchy(group.id, user.id).await;
        Ok(can_read_group(Some(user), group, member))
    }
}

#[async_trait]
impl UserRepository for FakeStore {
    async fn find(&self, id: i64) -> Result<Option<User>> {
        Ok(self.users.lock().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
        let Some(user_id) = self.tokens.lock().await.get(token).copied() else {
            return Ok(None);
        };
        UserRepository::find(self, user_id).await
    }
}

#[async_trait]
impl NoteRepository for FakeStore {
    async fn list_discussions(&self, noteable: NoteableRef) -> Result<Vec<Discussion>> {
        let notes: Vec<Note> = self
            .notes
            .lock()
            .await
            .iter()
            .filter(|n| n.noteable() == noteable)
            .cloned()
            .collect();
        Ok(Discussion::group(notes))
    }

    async fn find_discussion(
        &self,
        noteable: NoteableRef,
        discussion_id: &str,
    ) -> Result<Option<Discussion>> {
        Ok(self
            .list_discussions(noteable)
            .await?
            .into_iter()
            .find(|d| d.id() == discussion_id))
    }

    async fn notes_since(&self, noteable: NoteableRef, since: DateTime<Utc>) -> Result<Vec<Note>> {
        Ok(self
            .notes
            .lock()
            .await
            .iter()
            .filter(|n| n.noteable() == noteable && n.updated_at > since)
            .cloned()
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Note>> {
        Ok(self.notes.lock().await.iter().find(|n| n.id == id).cloned())
    }

    async fn insert(&self, req: CreateNoteRequest) -> Result<Note> {
        if let Some(discussion_id) = &req.discussion_id {
            if self
                .find_discussion(req.noteable, discussion_id)
                .await?
                .is_none()
            {
                return Err(Error::NotFound(format!(
                    "Discussion {} not found",
                    discussion_id
                )));
            }
        }
        let author = UserRepository::find(self, req.author_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {} not found", req.author_id)))?;
        let mut note = self
            .add_note(
                req.noteable,
                &author,
                &req.note,
                req.discussion_id.as_deref(),
            )
            .await;
        note.note_html = req.note_html;
        let now = Utc::now();
        note.created_at = now;
        note.updated_at = now;

        let mut notes = self.notes.lock().await;
        if let Some(stored) = notes.iter_mut().find(|n| n.id == note.id) {
            *stored = note.clone();
        }
        Ok(note)
    }

    async fn update(&self, id: i64, note: &str, note_html: &str) -> Result<Note> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut notes = self.notes.lock().await;
        let stored = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(Error::NoteNotFound(id))?;
        stored.note = note.to_string();
        stored.note_html = note_html.to_string();
        stored.updated_at = stored.updated_at.max(Utc::now()) + Duration::milliseconds(1);
        Ok(stored.clone())
    }
}
