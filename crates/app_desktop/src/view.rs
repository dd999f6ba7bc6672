use std::sync::Arc;

use core_types::{
    Agent, AgentKind, AgentPatch, AgentStatus, AppRoute, KnowledgeBase, KnowledgeBaseId,
    KnowledgeItem, KnowledgeItemId, KnowledgeItemStatus, ToastVariant,
};
use gpui::{
    Context, Div, KeyDownEvent, MouseButton, Rgba, SharedString, Stateful, Task, Window, div,
    hsla, prelude::*, px, rgb,
};
use i18n::I18n;
use studio_services::{
    AgentDraft, DEFAULT_GREETING_TEMPLATE, DEFAULT_MESSAGE_TEMPLATE, PromptSource, Sender, Studio,
    ToastLog, UsageMode, UsageSession, WatchGuard, default_selection,
};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::input::{Field, Form, KeyOutcome, read_upload};

const MUTED: u32 = 0x94a3b8;
const PANEL: u32 = 0x111827;
const ACCENT: u32 = 0x3b82f6;

pub struct StudioView {
    studio: Studio,
    runtime: Arc<Runtime>,
    toasts: Arc<ToastLog>,
    i18n: Arc<I18n>,
    path: String,
    route: AppRoute,
    form: Form,
    bases: Vec<KnowledgeBase>,
    selected_base: Option<KnowledgeBaseId>,
    items: Vec<KnowledgeItem>,
    agents: Vec<Agent>,
    agent_kind: AgentKind,
    agent_base: Option<KnowledgeBaseId>,
    prompt_from_pdf: bool,
    avatar_url: Option<String>,
    usage: Option<UsageSession>,
    voice_task: Option<JoinHandle<()>>,
    watches: Vec<WatchGuard>,
    seen_version: u64,
    _cache_updates: Task<()>,
}

impl StudioView {
    pub fn new(
        studio: Studio,
        runtime: Arc<Runtime>,
        toasts: Arc<ToastLog>,
        i18n: Arc<I18n>,
        cx: &mut Context<Self>,
    ) -> Self {
        // Redraw whenever the cache moves, including invalidations pushed by
        // realtime watches from other sessions.
        let mut versions = studio.context().cache().subscribe();
        let cache_updates = cx.spawn(async move |this, cx| {
            while versions.changed().await.is_ok() {
                if this.update(cx, |_, cx| cx.notify()).is_err() {
                    break;
                }
            }
        });

        let mut form = Form::default();
        form.set(Field::GreetingPrompt, DEFAULT_GREETING_TEMPLATE);
        form.set(Field::MessagePrompt, DEFAULT_MESSAGE_TEMPLATE);

        let mut view = Self {
            studio,
            runtime,
            toasts,
            i18n,
            path: AppRoute::Home.path().to_owned(),
            route: AppRoute::Home,
            form,
            bases: Vec::new(),
            selected_base: None,
            items: Vec::new(),
            agents: Vec::new(),
            agent_kind: AgentKind::Inbound,
            agent_base: None,
            prompt_from_pdf: false,
            avatar_url: None,
            usage: None,
            voice_task: None,
            watches: Vec::new(),
            seen_version: 0,
            _cache_updates: cache_updates,
        };
        view.navigate(AppRoute::Home.path());
        view
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn navigate(&mut self, path: &str) {
        let signed_in = self.studio.auth.is_signed_in();
        let route = AppRoute::resolve_guarded(path, signed_in);
        self.path = if route == AppRoute::NotFound {
            path.to_owned()
        } else {
            route.path().to_owned()
        };
        info!(requested = path, route = route.title(), "navigate");
        self.route = route;
        self.form.blur();
        self.sync_watches(signed_in);
        self.reload();
    }

    /// One change feed per table while a dashboard page is open.
    fn sync_watches(&mut self, signed_in: bool) {
        if !signed_in || !self.route.requires_session() {
            self.watches.clear();
            return;
        }
        if !self.watches.is_empty() {
            return;
        }
        let studio = self.studio.clone();
        let guards = self.block_on(async {
            [
                studio.knowledge_bases.watch().await,
                studio.knowledge_items.watch().await,
                studio.agents.watch().await,
            ]
        });
        self.watches = guards.into_iter().flatten().flatten().collect();
        debug!(count = self.watches.len(), "realtime watches active");
    }

    fn reload(&mut self) {
        match self.route {
            AppRoute::KnowledgeBase => {
                self.load_bases();
                self.selected_base = default_selection(&self.bases, self.selected_base);
                self.load_items();
            }
            AppRoute::Agents => {
                self.load_bases();
                if let Ok(agents) = self.block_on(self.studio.agents.list()) {
                    self.agents = agents;
                }
            }
            _ => {}
        }
        self.seen_version = self.studio.context().cache().version();
    }

    fn load_bases(&mut self) {
        if let Ok(bases) = self.block_on(self.studio.knowledge_bases.list()) {
            self.bases = bases;
        }
    }

    fn load_items(&mut self) {
        self.items = match self.selected_base {
            Some(id) => self
                .block_on(self.studio.knowledge_items.list(id))
                .unwrap_or_default(),
            None => Vec::new(),
        };
    }

    fn toast_error(&self, message: impl Into<String>) {
        self.studio
            .context()
            .toaster()
            .emit(ToastVariant::Destructive, "toast.error", message);
    }

    fn submit(&mut self, field: Field) {
        match field {
            Field::Email | Field::Password => self.sign_in(),
            Field::KbName | Field::KbDescription => self.create_knowledge_base(),
            Field::PdfPath => self.add_pdf(),
            Field::Url => self.add_url(),
            Field::TextTitle | Field::TextContent => self.add_text(),
            Field::AgentName | Field::AgentDescription => self.create_agent(),
            Field::AvatarPath => self.upload_avatar(),
            Field::ChatInput => self.send_chat(),
            Field::NewPassword | Field::ConfirmPassword => self.update_password(),
            Field::GreetingPrompt | Field::MessagePrompt | Field::PromptPdfPath => {}
        }
    }

    fn sign_in(&mut self) {
        let (email, password) = (self.form.value(Field::Email), self.form.value(Field::Password));
        if self.block_on(self.studio.auth.sign_in(email, password)).is_ok() {
            self.form.clear(Field::Password);
            self.navigate("/dashboard");
        }
    }

    fn sign_up(&mut self) {
        let (email, password) = (self.form.value(Field::Email), self.form.value(Field::Password));
        if let Ok(session) = self.block_on(self.studio.auth.sign_up(email, password)) {
            self.form.clear(Field::Password);
            if session.is_some() {
                self.navigate("/dashboard");
            }
        }
    }

    fn sign_out(&mut self) {
        let _ = self.block_on(self.studio.auth.sign_out());
        self.usage = None;
        self.bases.clear();
        self.items.clear();
        self.agents.clear();
        self.navigate(AppRoute::Home.path());
    }

    fn create_knowledge_base(&mut self) {
        let name = self.form.value(Field::KbName);
        let description = self.form.value(Field::KbDescription);
        if let Ok(base) = self.block_on(
            self.studio
                .knowledge_bases
                .create(name, Some(description)),
        ) {
            self.form.clear(Field::KbName);
            self.form.clear(Field::KbDescription);
            self.selected_base = Some(base.id);
            self.reload();
        }
    }

    fn delete_knowledge_base(&mut self, id: KnowledgeBaseId) {
        if self
            .block_on(self.studio.knowledge_bases.delete(id))
            .is_ok()
            && self.selected_base == Some(id)
        {
            self.selected_base = None;
        }
        self.reload();
    }

    fn select_base(&mut self, id: KnowledgeBaseId) {
        self.selected_base = Some(id);
        self.load_items();
    }

    fn add_pdf(&mut self) {
        let upload = match read_upload(self.form.value(Field::PdfPath)) {
            Ok(upload) => upload,
            Err(err) => return self.toast_error(err.to_string()),
        };
        if self
            .block_on(self.studio.ingestion.add_pdf(self.selected_base, upload))
            .is_ok()
        {
            self.form.clear(Field::PdfPath);
        }
        self.load_items();
    }

    fn add_url(&mut self) {
        let url = self.form.value(Field::Url);
        if self
            .block_on(self.studio.ingestion.add_url(self.selected_base, url))
            .is_ok()
        {
            self.form.clear(Field::Url);
        }
        self.load_items();
    }

    fn add_text(&mut self) {
        let title = self.form.value(Field::TextTitle);
        let content = self.form.value(Field::TextContent);
        if self
            .block_on(
                self.studio
                    .ingestion
                    .add_text(self.selected_base, title, content),
            )
            .is_ok()
        {
            self.form.clear(Field::TextTitle);
            self.form.clear(Field::TextContent);
        }
        self.load_items();
    }

    fn delete_item(&mut self, id: KnowledgeItemId) {
        let _ = self.block_on(self.studio.knowledge_items.delete(id));
        self.load_items();
    }

    fn cycle_agent_base(&mut self) {
        let position = self
            .agent_base
            .and_then(|current| self.bases.iter().position(|base| base.id == current));
        self.agent_base = match position {
            Some(index) => self.bases.get(index + 1).map(|base| base.id),
            None => self.bases.first().map(|base| base.id),
        };
    }

    fn create_agent(&mut self) {
        let source = if self.prompt_from_pdf {
            match read_upload(self.form.value(Field::PromptPdfPath)) {
                Ok(upload) => PromptSource::Pdf(upload),
                Err(err) => return self.toast_error(err.to_string()),
            }
        } else {
            PromptSource::Manual {
                greeting: self.form.value(Field::GreetingPrompt).to_owned(),
                message: self.form.value(Field::MessagePrompt).to_owned(),
            }
        };
        let description = self.form.value(Field::AgentDescription);
        let draft = AgentDraft {
            name: self.form.value(Field::AgentName).to_owned(),
            description: (!description.trim().is_empty()).then(|| description.to_owned()),
            kind: self.agent_kind,
            knowledge_base_id: self.agent_base,
            status: AgentStatus::Active,
            avatar_url: self.avatar_url.clone(),
        };

        if self
            .block_on(self.studio.agents.create_with_prompt(draft, source))
            .is_ok()
        {
            for field in [Field::AgentName, Field::AgentDescription, Field::PromptPdfPath] {
                self.form.clear(field);
            }
            self.form.set(Field::GreetingPrompt, DEFAULT_GREETING_TEMPLATE);
            self.form.set(Field::MessagePrompt, DEFAULT_MESSAGE_TEMPLATE);
            self.agent_base = None;
            self.avatar_url = None;
            self.prompt_from_pdf = false;
        }
        self.reload();
    }

    fn toggle_agent_status(&mut self, agent: &Agent) {
        let status = match agent.status {
            AgentStatus::Active => AgentStatus::Inactive,
            AgentStatus::Inactive => AgentStatus::Active,
        };
        let patch = AgentPatch {
            status: Some(status),
            ..AgentPatch::default()
        };
        let _ = self.block_on(self.studio.agents.update(agent.id, patch));
        self.reload();
    }

    fn delete_agent(&mut self, agent: &Agent) {
        let _ = self.block_on(self.studio.agents.delete(agent.id));
        if let Some(url) = agent.avatar_url.as_deref() {
            let _ = self.block_on(self.studio.avatars.remove(url));
        }
        self.reload();
    }

    fn upload_avatar(&mut self) {
        let upload = match read_upload(self.form.value(Field::AvatarPath)) {
            Ok(upload) => upload,
            Err(err) => return self.toast_error(err.to_string()),
        };
        if let Ok(url) = self.block_on(self.studio.avatars.upload(upload)) {
            self.form.clear(Field::AvatarPath);
            self.avatar_url = Some(url);
        }
    }

    fn remove_avatar(&mut self) {
        let Some(url) = self.avatar_url.clone() else {
            return;
        };
        if self.block_on(self.studio.avatars.remove(&url)).is_ok() {
            self.avatar_url = None;
        }
    }

    fn open_usage(&mut self, agent: Agent) {
        self.close_usage();
        self.usage = Some(self.studio.usage(agent));
    }

    fn close_usage(&mut self) {
        if let Some(task) = self.voice_task.take() {
            task.abort();
        }
        if let Some(session) = self.usage.take() {
            session.close();
        }
        self.form.clear(Field::ChatInput);
    }

    fn send_chat(&mut self) {
        let Some(session) = self.usage.clone() else {
            return;
        };
        let text = self.form.value(Field::ChatInput).to_owned();
        self.form.clear(Field::ChatInput);
        if let Err(err) = self.block_on(session.send_message(&text)) {
            warn!(error = %err, "chat message failed");
        }
    }

    fn start_listening(&mut self) {
        let Some(session) = self.usage.clone() else {
            return;
        };
        if self.voice_task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        self.voice_task = Some(
            self.runtime
                .spawn(async move { session.simulate_listening().await }),
        );
    }

    fn update_password(&mut self) {
        let password = self.form.value(Field::NewPassword);
        let confirm = self.form.value(Field::ConfirmPassword);
        if self
            .block_on(self.studio.auth.update_password(password, confirm))
            .is_ok()
        {
            self.form.clear(Field::NewPassword);
            self.form.clear(Field::ConfirmPassword);
        }
    }
}

impl Render for StudioView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        if self.studio.context().cache().version() != self.seen_version {
            self.reload();
        }
        if self
            .voice_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
        {
            window.request_animation_frame();
        }

        let page = match self.route {
            AppRoute::Home => self.render_home(cx).into_any_element(),
            AppRoute::Auth => self.render_auth(cx).into_any_element(),
            AppRoute::KnowledgeBase => self.render_knowledge_base(cx).into_any_element(),
            AppRoute::Agents => self.render_agents(cx).into_any_element(),
            AppRoute::Actions => self.render_actions().into_any_element(),
            AppRoute::Profile => self.render_profile(cx).into_any_element(),
            AppRoute::NotFound => self.render_not_found(cx).into_any_element(),
        };

        let content = div()
            .id("content")
            .flex()
            .flex_col()
            .flex_1()
            .h_full()
            .overflow_y_scroll()
            .p_4()
            .gap_3()
            .child(div().text_xl().child(self.route.title()))
            .child(div().text_xs().text_color(rgb(MUTED)).child(self.path.clone()))
            .child(page);

        div()
            .size_full()
            .flex()
            .bg(rgb(0x0b1120))
            .text_color(rgb(0xe2e8f0))
            .text_sm()
            .tab_index(0)
            .on_key_down(cx.listener(|this, event: &KeyDownEvent, _window, cx| {
                let keystroke = &event.keystroke;
                let modified = keystroke.modifiers.control || keystroke.modifiers.platform;
                let outcome = this.form.apply_key(
                    keystroke.key.as_str(),
                    keystroke.key_char.as_deref(),
                    modified,
                );
                if let KeyOutcome::Submit(field) = outcome {
                    this.submit(field);
                }
                if outcome != KeyOutcome::Ignored {
                    cx.notify();
                }
            }))
            .child(self.render_sidebar(cx))
            .child(content)
            .child(self.render_toasts(cx))
    }
}

impl StudioView {
    fn render_sidebar(&self, cx: &mut Context<Self>) -> Stateful<Div> {
        let signed_in = self.studio.auth.is_signed_in();
        let routes: &[AppRoute] = if signed_in {
            &[
                AppRoute::Home,
                AppRoute::Agents,
                AppRoute::KnowledgeBase,
                AppRoute::Actions,
                AppRoute::Profile,
            ]
        } else {
            &[AppRoute::Home, AppRoute::Auth]
        };

        let mut sidebar = div()
            .id("sidebar")
            .flex()
            .flex_col()
            .gap_1()
            .w(px(220.))
            .h_full()
            .p_3()
            .bg(rgb(0x1f2937))
            .border_r_1()
            .border_color(hsla(0.0, 0.0, 1.0, 0.14))
            .child(div().text_lg().pb_2().child(self.i18n.t("app.title").to_owned()));
        for route in routes.iter().copied() {
            let selected = route == self.route;
            sidebar = sidebar.child(
                div()
                    .px_2()
                    .py_1()
                    .rounded_sm()
                    .bg(if selected { rgb(0x334155) } else { rgb(PANEL) })
                    .on_mouse_down(
                        MouseButton::Left,
                        cx.listener(move |this, _event, _window, cx| {
                            this.navigate(route.path());
                            cx.notify();
                        }),
                    )
                    .child(self.i18n.t(nav_key(route)).to_owned()),
            );
        }
        if let Some(user) = self.studio.auth.current_user() {
            sidebar = sidebar
                .child(
                    div()
                        .pt_4()
                        .text_xs()
                        .text_color(rgb(MUTED))
                        .child(user.email.unwrap_or_default()),
                )
                .child(button("Sign out", cx, |this, _cx| this.sign_out()));
        }
        sidebar
    }

    fn render_home(&self, cx: &mut Context<Self>) -> Div {
        let target = if self.studio.auth.is_signed_in() {
            "/dashboard"
        } else {
            AppRoute::Auth.path()
        };
        div()
            .flex()
            .flex_col()
            .gap_3()
            .child("Build AI agents grounded in your own knowledge bases.")
            .child(
                div()
                    .text_color(rgb(MUTED))
                    .child("Upload PDFs, web pages or notes, then put an agent in front of them."),
            )
            .child(button("Get started", cx, move |this, _cx| this.navigate(target)))
    }

    fn render_auth(&self, cx: &mut Context<Self>) -> Div {
        div()
            .flex()
            .flex_col()
            .gap_2()
            .w(px(360.))
            .child(self.text_field(Field::Email, cx))
            .child(self.text_field(Field::Password, cx))
            .child(
                div()
                    .flex()
                    .gap_2()
                    .child(button("Sign in", cx, |this, _cx| this.sign_in()))
                    .child(button("Sign up", cx, |this, _cx| this.sign_up())),
            )
    }

    fn render_knowledge_base(&self, cx: &mut Context<Self>) -> Div {
        let mut bases = div()
            .flex()
            .flex_col()
            .gap_1()
            .w(px(260.))
            .child(section_title(
                "Knowledge bases",
                self.studio.knowledge_bases.is_loading(),
            ));
        for base in &self.bases {
            let id = base.id;
            let selected = self.selected_base == Some(id);
            bases = bases.child(
                div()
                    .flex()
                    .justify_between()
                    .px_2()
                    .py_1()
                    .rounded_sm()
                    .bg(if selected { rgb(0x334155) } else { rgb(PANEL) })
                    .child(
                        div()
                            .flex_1()
                            .on_mouse_down(
                                MouseButton::Left,
                                cx.listener(move |this, _event, _window, cx| {
                                    this.select_base(id);
                                    cx.notify();
                                }),
                            )
                            .child(base.name.clone()),
                    )
                    .child(button("✕", cx, move |this, _cx| this.delete_knowledge_base(id))),
            );
        }
        bases = bases
            .child(self.text_field(Field::KbName, cx))
            .child(self.text_field(Field::KbDescription, cx))
            .child(button("Create knowledge base", cx, |this, _cx| {
                this.create_knowledge_base()
            }));

        let add_content = div()
            .flex()
            .flex_col()
            .gap_2()
            .p_3()
            .rounded_md()
            .bg(rgb(PANEL))
            .child(div().text_color(rgb(MUTED)).child("Add content"))
            .child(self.text_field(Field::PdfPath, cx))
            .child(button("Upload PDF", cx, |this, _cx| this.add_pdf()))
            .child(self.text_field(Field::Url, cx))
            .child(button("Add URL", cx, |this, _cx| this.add_url()))
            .child(self.text_field(Field::TextTitle, cx))
            .child(self.text_field(Field::TextContent, cx))
            .child(button("Add text", cx, |this, _cx| this.add_text()));

        let items_loading = self
            .selected_base
            .is_some_and(|id| self.studio.knowledge_items.is_loading(id));
        let mut items = div()
            .flex()
            .flex_col()
            .gap_1()
            .child(section_title("Items", items_loading));
        if self.items.is_empty() {
            items = items.child(div().text_color(rgb(MUTED)).child("No items yet."));
        }
        for item in &self.items {
            let id = item.id;
            items = items.child(
                div()
                    .flex()
                    .justify_between()
                    .gap_2()
                    .p_2()
                    .rounded_sm()
                    .bg(rgb(PANEL))
                    .child(
                        div()
                            .flex()
                            .flex_col()
                            .child(item.title.clone())
                            .child(
                                div()
                                    .text_xs()
                                    .text_color(rgb(MUTED))
                                    .child(item.source_label()),
                            ),
                    )
                    .child(
                        div()
                            .text_xs()
                            .text_color(status_color(item.status))
                            .child(status_label(item.status)),
                    )
                    .child(button("Delete", cx, move |this, _cx| this.delete_item(id))),
            );
        }

        div()
            .flex()
            .gap_4()
            .child(bases)
            .child(
                div()
                    .flex()
                    .flex_col()
                    .flex_1()
                    .gap_3()
                    .child(add_content)
                    .child(items),
            )
    }

    fn render_agents(&self, cx: &mut Context<Self>) -> Div {
        let mut list = div()
            .flex()
            .flex_col()
            .gap_2()
            .child(section_title("Agents", self.studio.agents.is_loading()));
        if self.agents.is_empty() {
            list = list.child(div().text_color(rgb(MUTED)).child("No agents yet."));
        }
        for agent in &self.agents {
            let (use_agent, toggle, remove) = (agent.clone(), agent.clone(), agent.clone());
            let kind = match agent.kind {
                AgentKind::Inbound => "inbound",
                AgentKind::Outbound => "outbound",
            };
            let status = match agent.status {
                AgentStatus::Active => "active",
                AgentStatus::Inactive => "inactive",
            };
            list = list.child(
                div()
                    .flex()
                    .flex_col()
                    .gap_1()
                    .p_2()
                    .rounded_md()
                    .bg(rgb(PANEL))
                    .child(div().text_base().child(agent.name.clone()))
                    .child(
                        div()
                            .text_xs()
                            .text_color(rgb(MUTED))
                            .child(format!(
                                "{kind} • {status} • {}",
                                self.studio
                                    .agents
                                    .knowledge_base_name(agent.knowledge_base_id, &self.bases)
                            )),
                    )
                    .child(
                        div()
                            .flex()
                            .gap_2()
                            .child(button("Use", cx, move |this, _cx| {
                                this.open_usage(use_agent.clone())
                            }))
                            .child(button("Toggle status", cx, move |this, _cx| {
                                this.toggle_agent_status(&toggle)
                            }))
                            .child(button("Delete", cx, move |this, _cx| {
                                this.delete_agent(&remove)
                            })),
                    ),
            );
        }

        let base_label = match self.agent_base {
            Some(id) => self.studio.agents.knowledge_base_name(id, &self.bases),
            None => "Select a knowledge base".to_owned(),
        };
        let kind_label = match self.agent_kind {
            AgentKind::Inbound => "Type: inbound",
            AgentKind::Outbound => "Type: outbound",
        };
        let mut create = div()
            .flex()
            .flex_col()
            .gap_2()
            .w(px(380.))
            .p_3()
            .rounded_md()
            .bg(rgb(PANEL))
            .child(div().text_color(rgb(MUTED)).child("Create agent"))
            .child(self.text_field(Field::AgentName, cx))
            .child(self.text_field(Field::AgentDescription, cx))
            .child(button(kind_label, cx, |this, _cx| {
                this.agent_kind = match this.agent_kind {
                    AgentKind::Inbound => AgentKind::Outbound,
                    AgentKind::Outbound => AgentKind::Inbound,
                };
            }))
            .child(button(base_label, cx, |this, _cx| this.cycle_agent_base()))
            .child(button(
                if self.prompt_from_pdf {
                    "Prompt: PDF"
                } else {
                    "Prompt: manual"
                },
                cx,
                |this, _cx| this.prompt_from_pdf = !this.prompt_from_pdf,
            ));
        create = if self.prompt_from_pdf {
            create.child(self.text_field(Field::PromptPdfPath, cx))
        } else {
            create
                .child(self.text_field(Field::GreetingPrompt, cx))
                .child(self.text_field(Field::MessagePrompt, cx))
        };
        create = match &self.avatar_url {
            Some(url) => create
                .child(div().text_xs().text_color(rgb(MUTED)).child(url.clone()))
                .child(button("Remove avatar", cx, |this, _cx| this.remove_avatar())),
            None => create
                .child(self.text_field(Field::AvatarPath, cx))
                .child(button("Upload avatar", cx, |this, _cx| this.upload_avatar())),
        };
        create = create.child(button("Create agent", cx, |this, _cx| this.create_agent()));

        let mut page = div()
            .flex()
            .gap_4()
            .child(div().flex_1().child(list))
            .child(create);
        if let Some(session) = &self.usage {
            page = page.child(self.render_usage(session, cx));
        }
        page
    }

    fn render_usage(&self, session: &UsageSession, cx: &mut Context<Self>) -> Div {
        let state = session.snapshot();
        let agent = session.agent();
        let mut panel = div()
            .flex()
            .flex_col()
            .gap_2()
            .w(px(340.))
            .p_3()
            .rounded_md()
            .bg(rgb(0x1e293b))
            .child(div().text_base().child(agent.name.clone()))
            .child(
                div()
                    .text_xs()
                    .text_color(rgb(MUTED))
                    .child(agent.description.clone().unwrap_or_else(|| "No description".to_owned())),
            );

        panel = match state.mode {
            UsageMode::Selection => panel
                .child(button("Voice call", cx, |this, _cx| {
                    if let Some(session) = &this.usage {
                        session.start_voice();
                    }
                }))
                .child(button("Text chat", cx, |this, _cx| {
                    if let Some(session) = &this.usage {
                        session.start_chat();
                    }
                })),
            UsageMode::Chat | UsageMode::Voice => {
                let mut transcript = div().flex().flex_col().gap_1();
                for message in &state.messages {
                    let (prefix, color) = match message.sender {
                        Sender::User => ("You", rgb(ACCENT)),
                        Sender::Agent => ("Agent", rgb(0xe2e8f0)),
                    };
                    transcript = transcript.child(
                        div()
                            .text_color(color)
                            .child(format!("{prefix}: {}", message.text)),
                    );
                }
                if state.loading {
                    transcript = transcript.child(div().text_color(rgb(MUTED)).child("…"));
                }
                panel = panel.child(transcript);
                if state.mode == UsageMode::Chat {
                    panel
                        .child(self.text_field(Field::ChatInput, cx))
                        .child(button("Send", cx, |this, _cx| this.send_chat()))
                } else {
                    let label = if state.listening {
                        "Listening..."
                    } else if state.speaking {
                        "Speaking..."
                    } else {
                        "Start talking"
                    };
                    panel.child(button(label, cx, |this, _cx| this.start_listening()))
                }
            }
        };
        panel.child(button("Close", cx, |this, _cx| this.close_usage()))
    }

    fn render_actions(&self) -> Div {
        div()
            .flex()
            .flex_col()
            .gap_2()
            .p_4()
            .rounded_md()
            .bg(rgb(PANEL))
            .child(div().text_lg().child(self.i18n.t("actions.coming_soon").to_owned()))
            .child(
                div()
                    .text_color(rgb(MUTED))
                    .child(self.i18n.t("actions.under_development").to_owned()),
            )
    }

    fn render_profile(&self, cx: &mut Context<Self>) -> Div {
        let email = self
            .studio
            .auth
            .current_user()
            .and_then(|user| user.email)
            .unwrap_or_default();
        div()
            .flex()
            .flex_col()
            .gap_2()
            .w(px(360.))
            .child(format!("Email: {email}"))
            .child(self.text_field(Field::NewPassword, cx))
            .child(self.text_field(Field::ConfirmPassword, cx))
            .child(button("Update password", cx, |this, _cx| this.update_password()))
    }

    fn render_not_found(&self, cx: &mut Context<Self>) -> Div {
        div()
            .flex()
            .flex_col()
            .gap_2()
            .child(div().text_xl().child("404"))
            .child("Oops! Page not found")
            .child(button("Return to Home", cx, |this, _cx| {
                this.navigate(AppRoute::Home.path())
            }))
    }

    fn render_toasts(&self, cx: &mut Context<Self>) -> Div {
        let mut stack = div()
            .flex()
            .flex_col()
            .gap_2()
            .w(px(300.))
            .p_3()
            .on_mouse_down(
                MouseButton::Left,
                cx.listener(|this, _event, _window, cx| {
                    this.toasts.drain();
                    cx.notify();
                }),
            );
        for toast in self.toasts.snapshot().into_iter().rev() {
            let border = match toast.variant {
                ToastVariant::Default => rgb(0x334155),
                ToastVariant::Warning => rgb(0xf59e0b),
                ToastVariant::Destructive => rgb(0xef4444),
            };
            stack = stack.child(
                div()
                    .flex()
                    .flex_col()
                    .p_2()
                    .rounded_md()
                    .border_1()
                    .border_color(border)
                    .bg(rgb(PANEL))
                    .child(toast.title)
                    .child(div().text_xs().text_color(rgb(MUTED)).child(toast.description)),
            );
        }
        stack
    }

    fn text_field(&self, field: Field, cx: &mut Context<Self>) -> Div {
        let focused = self.form.focused() == Some(field);
        let text = self.form.display(field);
        let (text, color) = if text.is_empty() {
            (field.placeholder().to_owned(), rgb(0x64748b))
        } else {
            (text, rgb(0xe2e8f0))
        };
        div()
            .px_2()
            .py_1()
            .rounded_md()
            .border_1()
            .border_color(if focused { rgb(ACCENT) } else { rgb(0x334155) })
            .bg(rgb(0x0f172a))
            .text_color(color)
            .on_mouse_down(
                MouseButton::Left,
                cx.listener(move |this, _event, _window, cx| {
                    this.form.focus(field);
                    cx.notify();
                }),
            )
            .child(if focused { format!("{text}▏") } else { text })
    }
}

fn button(
    label: impl Into<SharedString>,
    cx: &mut Context<StudioView>,
    handler: impl Fn(&mut StudioView, &mut Context<StudioView>) + 'static,
) -> Div {
    div()
        .px_3()
        .py_1()
        .rounded_md()
        .bg(rgb(0x1d4ed8))
        .text_color(rgb(0xffffff))
        .cursor_pointer()
        .on_mouse_down(
            MouseButton::Left,
            cx.listener(move |this, _event, _window, cx| {
                handler(this, cx);
                cx.notify();
            }),
        )
        .child(label.into())
}

fn section_title(title: &str, loading: bool) -> Div {
    let text = if loading {
        format!("{title} (loading...)")
    } else {
        title.to_owned()
    };
    div().text_color(rgb(MUTED)).child(text)
}

fn nav_key(route: AppRoute) -> &'static str {
    match route {
        AppRoute::Home => "nav.home",
        AppRoute::Auth => "nav.auth",
        AppRoute::Agents => "nav.agents",
        AppRoute::KnowledgeBase => "nav.knowledge_base",
        AppRoute::Actions => "nav.actions",
        AppRoute::Profile | AppRoute::NotFound => "nav.profile",
    }
}

fn status_label(status: KnowledgeItemStatus) -> &'static str {
    match status {
        KnowledgeItemStatus::Processing => "processing",
        KnowledgeItemStatus::Completed => "completed",
        KnowledgeItemStatus::Error => "error",
    }
}

fn status_color(status: KnowledgeItemStatus) -> Rgba {
    match status {
        KnowledgeItemStatus::Processing => rgb(0xf59e0b),
        KnowledgeItemStatus::Completed => rgb(0x22c55e),
        KnowledgeItemStatus::Error => rgb(0xef4444),
    }
}
