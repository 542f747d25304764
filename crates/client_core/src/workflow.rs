//! Modal dialog lifecycle for the management view.

use shared::domain::{Post, PostId};
use tokio::sync::broadcast;
use tracing::warn;

use crate::{mutations::MutationPipeline, ClientEvent};

/// Editable fields backing the editor dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub publish: bool,
}

impl PostForm {
    fn seeded_from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            content: post.content.clone(),
            publish: post.published,
        }
    }
}

/// Which modal is open. One variant at a time; a second open dialog is
/// unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    Closed,
    Editing {
        /// `None` while creating, the original post while editing.
        target: Option<Post>,
        form: PostForm,
    },
    ConfirmingDelete(PostId),
}

/// User-visible notification request; rendering it is the consumer's
/// concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Drives the create/edit/delete dialogs and feeds the mutation pipeline.
/// Opening a dialog while another is active is not a reachable input from
/// the UI; such calls are ignored with a warning.
pub struct ManagementWorkflow {
    mutations: MutationPipeline,
    dialog: Dialog,
    events: broadcast::Sender<ClientEvent>,
}

impl ManagementWorkflow {
    pub fn new(mutations: MutationPipeline, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            mutations,
            dialog: Dialog::Closed,
            events,
        }
    }

    pub fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    pub fn open_create(&mut self) {
        if !matches!(self.dialog, Dialog::Closed) {
            warn!("ignoring open_create while another dialog is active");
            return;
        }
        self.dialog = Dialog::Editing {
            target: None,
            form: PostForm::default(),
        };
    }

    pub fn open_edit(&mut self, post: Post) {
        if !matches!(self.dialog, Dialog::Closed) {
            warn!("ignoring open_edit while another dialog is active");
            return;
        }
        let form = PostForm::seeded_from(&post);
        self.dialog = Dialog::Editing {
            target: Some(post),
            form,
        };
    }

    pub fn open_delete(&mut self, id: PostId) {
        if !matches!(self.dialog, Dialog::Closed) {
            warn!("ignoring open_delete while another dialog is active");
            return;
        }
        self.dialog = Dialog::ConfirmingDelete(id);
    }

    /// Close whichever dialog is open and drop its form state.
    pub fn cancel(&mut self) {
        self.dialog = Dialog::Closed;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        if let Dialog::Editing { form, .. } = &mut self.dialog {
            form.title = title.into();
        }
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        if let Dialog::Editing { form, .. } = &mut self.dialog {
            form.content = content.into();
        }
    }

    pub fn set_publish(&mut self, publish: bool) {
        if let Dialog::Editing { form, .. } = &mut self.dialog {
            form.publish = publish;
        }
    }

    /// Submit the editor form: create when there is no target, update the
    /// target otherwise. Success closes the dialog; failure keeps it open so
    /// the input can be corrected.
    pub async fn submit(&mut self) {
        let Dialog::Editing { target, form } = self.dialog.clone() else {
            warn!("ignoring submit with no editor open");
            return;
        };
        let outcome = match &target {
            Some(post) => self.mutations.update(&post.id, &form).await,
            None => self.mutations.create(&form).await,
        };
        match outcome {
            Ok(_) => {
                self.dialog = Dialog::Closed;
                let text = if target.is_some() {
                    "post updated"
                } else {
                    "post created"
                };
                self.notify(Notice::Success(text.to_string()));
            }
            Err(error) => {
                self.notify(Notice::Error(error.to_string()));
            }
        }
    }

    /// Run the confirmed deletion. The confirmation closes regardless of the
    /// outcome; a failure is reported as a notice, not by reopening it.
    pub async fn confirm_delete(&mut self) {
        let Dialog::ConfirmingDelete(id) = self.dialog.clone() else {
            warn!("ignoring confirm_delete with no confirmation open");
            return;
        };
        let outcome = self.mutations.remove(&id).await;
        self.dialog = Dialog::Closed;
        match outcome {
            Ok(()) => self.notify(Notice::Success("post deleted".to_string())),
            Err(error) => self.notify(Notice::Error(error.to_string())),
        }
    }

    fn notify(&self, notice: Notice) {
        let _ = self.events.send(ClientEvent::Notice(notice));
    }
}
