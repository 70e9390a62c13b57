use std::rc::Rc;
use std::sync::mpsc::{Receiver, TryRecvError};

use buddy_engine::{
    screen_to_arena, Buddy, BuddyConfig, BuddyVisual, Collidable, InputAction, InputSnapshot,
    LayoutDef, LocomotionState, ObstacleProvider, ObstacleRegistry, PanelVisual, Rect, Scene,
    SceneCommand, SceneWorld, Viewport,
};
use tracing::{debug, info, warn};

use super::chat::{ChatEvent, ChatJob, ChatWorker};
use super::console::{parse_console_line, ConsoleCommand, ConsoleInput, HELP_TEXT};
use super::navigation::PageNavigator;
use super::quiz::{Quiz, QuizStep, QuizTranscript};

pub(crate) const QUIZ_PAGE: &str = "quiz";
pub(crate) const CHAT_PAGE: &str = "chat";

struct PanelInstance {
    /// `None` for panels shown on every page.
    page: Option<String>,
    name: String,
    bounds: Rect,
    collidable: Option<Rc<Collidable>>,
}

impl PanelInstance {
    fn visible_on(&self, active_page: &str) -> bool {
        self.page.as_deref().map_or(true, |page| page == active_page)
    }
}

/// Collidables of the panels that are currently on screen.
struct VisiblePanels<'a> {
    panels: &'a [PanelInstance],
    active_page: &'a str,
}

impl ObstacleProvider for VisiblePanels<'_> {
    fn collidables(&self) -> Vec<Rc<Collidable>> {
        self.panels
            .iter()
            .filter(|panel| panel.visible_on(self.active_page))
            .filter_map(|panel| panel.collidable.clone())
            .collect()
    }
}

pub(crate) struct CompanionParts {
    pub(crate) layout: LayoutDef,
    pub(crate) buddy_config: BuddyConfig,
    pub(crate) wander_seed: Option<u64>,
    pub(crate) navigator: PageNavigator,
    pub(crate) quiz: Quiz,
    pub(crate) chat: Option<ChatWorker>,
    pub(crate) console: Option<Receiver<String>>,
    pub(crate) echo_to_stdout: bool,
}

/// The single running scene: Buddy, the panels it stands on, and the
/// quiz/chat collaborators driven from console input.
pub(crate) struct CompanionScene {
    layout: LayoutDef,
    buddy: Buddy,
    registry: ObstacleRegistry,
    panels: Vec<PanelInstance>,
    navigator: PageNavigator,
    quiz: Quiz,
    transcripts: Receiver<QuizTranscript>,
    chat: Option<ChatWorker>,
    console: Option<Receiver<String>>,
    /// User preference from the W key or `/wander`; pages can still veto it.
    wander_requested: bool,
    dragging: bool,
    quit_requested: bool,
    echo_to_stdout: bool,
    console_lines: Vec<String>,
}

impl CompanionScene {
    pub(crate) fn new(parts: CompanionParts) -> Self {
        let CompanionParts {
            layout,
            buddy_config,
            wander_seed,
            navigator,
            mut quiz,
            chat,
            console,
            echo_to_stdout,
        } = parts;

        let wander_requested = buddy_config.can_wander;
        let arena = layout.arena;
        let half_extents = layout.buddy.half_extents;
        let spawn = layout.buddy.spawn;
        let buddy = match wander_seed {
            Some(seed) => Buddy::with_seed(buddy_config, arena, half_extents, spawn, seed),
            None => Buddy::new(buddy_config, arena, half_extents, spawn),
        };
        let transcripts = quiz.subscribe();

        Self {
            layout,
            buddy,
            registry: ObstacleRegistry::new(),
            panels: Vec::new(),
            navigator,
            quiz,
            transcripts,
            chat,
            console,
            wander_requested,
            dragging: false,
            quit_requested: false,
            echo_to_stdout,
            console_lines: Vec::new(),
        }
    }

    fn build_panels(&mut self) {
        let global = self
            .layout
            .global_panels
            .iter()
            .map(|panel| (None, panel));
        let paged = self.layout.pages.iter().flat_map(|page| {
            page.panels
                .iter()
                .map(move |panel| (Some(page.name.clone()), panel))
        });
        self.panels = global
            .chain(paged)
            .map(|(page, panel)| PanelInstance {
                page,
                name: panel.name.clone(),
                bounds: panel.bounds,
                collidable: panel
                    .collidable
                    .then(|| Collidable::new(panel.name.clone(), panel.bounds)),
            })
            .collect();
    }

    fn refresh_obstacles(&mut self) {
        let provider = VisiblePanels {
            panels: &self.panels,
            active_page: self.navigator.active(),
        };
        self.registry.refresh(&provider);
    }

    fn active_page_allows_wander(&self) -> bool {
        self.layout
            .page(self.navigator.active())
            .map_or(true, |page| page.allows_wander)
    }

    fn apply_wander_policy(&mut self) {
        let effective = self.wander_requested && self.active_page_allows_wander();
        if effective != self.buddy.can_wander() {
            debug!(
                can_wander = effective,
                page = self.navigator.active(),
                "wander_policy_applied"
            );
        }
        self.buddy.set_can_wander(effective);
    }

    fn on_page_changed(&mut self) {
        self.refresh_obstacles();
        self.buddy.obstacles_changed(&self.registry);
        self.apply_wander_policy();
        let page = self.navigator.active().to_string();
        self.say(format!("[page: {page}]"));
        if page == QUIZ_PAGE {
            self.prompt_quiz();
        }
    }

    fn switch_page(&mut self, name: &str) {
        match self.navigator.switch_to(name) {
            Ok(true) => self.on_page_changed(),
            Ok(false) => {}
            Err(error) => self.say(error.to_string()),
        }
    }

    fn set_wander_requested(&mut self, enabled: bool) {
        self.wander_requested = enabled;
        info!(wander_requested = enabled, "wander_toggled");
        self.apply_wander_policy();
    }

    fn prompt_quiz(&mut self) {
        match (self.quiz.question_number(), self.quiz.current_question()) {
            (Some(number), Some(question)) => {
                let line = format!("Question {number}/{}: {question}", self.quiz.len());
                self.say(line);
            }
            _ if self.quiz.len() == 0 => self.say("No quiz questions are available.".to_string()),
            _ => self.say("Quiz complete. Thanks!".to_string()),
        }
    }

    fn handle_keys(&mut self, input: &InputSnapshot) {
        if input.was_pressed(InputAction::ToggleWander) {
            self.set_wander_requested(!self.wander_requested);
        }
        if input.was_pressed(InputAction::CyclePage) && self.navigator.cycle_next() {
            self.on_page_changed();
        }
    }

    fn handle_pointer(&mut self, input: &InputSnapshot) {
        let (width, height) = input.window_size();
        let viewport = Viewport { width, height };
        let pointer = input
            .cursor_position_px()
            .and_then(|px| screen_to_arena(px, self.layout.arena, viewport));

        if self.dragging {
            if let Some(point) = pointer {
                self.buddy.drag_move(point);
            }
            if input.left_click_released() || !input.left_mouse_down() {
                self.dragging = false;
                self.buddy.drag_end();
            }
            return;
        }

        if !input.left_click_pressed() {
            return;
        }
        let Some(point) = pointer else {
            return;
        };
        if self.buddy.body_rect().contains(point) {
            self.dragging = true;
            self.buddy.drag_start(point);
        }
    }

    fn drain_console(&mut self) {
        let Some(console) = &self.console else {
            return;
        };
        let mut lines = Vec::new();
        let mut disconnected = false;
        loop {
            match console.try_recv() {
                Ok(line) => lines.push(line),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }
        if disconnected {
            debug!("console_closed");
            self.console = None;
        }
        for line in lines {
            self.handle_console_line(&line);
        }
    }

    fn handle_console_line(&mut self, line: &str) {
        match parse_console_line(line) {
            None => {}
            Some(Err(error)) => self.say(format!("{} (usage: {})", error.reason, error.usage)),
            Some(Ok(ConsoleInput::Command(command))) => self.handle_command(command),
            Some(Ok(ConsoleInput::Text(text))) => self.route_text(text),
        }
    }

    fn handle_command(&mut self, command: ConsoleCommand) {
        match command {
            ConsoleCommand::Help => {
                let pages = self.navigator.pages().join(", ");
                self.say(format!("{HELP_TEXT}\npages: {pages}"));
            }
            ConsoleCommand::Page { name } => self.switch_page(&name),
            ConsoleCommand::Wander { enabled } => self.set_wander_requested(enabled),
            ConsoleCommand::Quit => {
                info!(reason = "console_command", "shutdown_requested");
                self.quit_requested = true;
            }
        }
    }

    fn route_text(&mut self, text: String) {
        if self.navigator.is_active(QUIZ_PAGE) {
            match self.quiz.submit_answer(&text) {
                Ok(QuizStep::NextQuestion) | Ok(QuizStep::Finished) => self.prompt_quiz(),
                Err(error) => self.say(error.to_string()),
            }
        } else if self.navigator.is_active(CHAT_PAGE) {
            self.submit_chat(ChatJob::UserMessage(text));
        } else {
            self.say(format!(
                "Switch to the '{QUIZ_PAGE}' or '{CHAT_PAGE}' page to talk to Buddy."
            ));
        }
    }

    fn submit_chat(&mut self, job: ChatJob) {
        let result = match &self.chat {
            Some(chat) => chat.submit(job),
            None => {
                warn!("chat_unavailable");
                return;
            }
        };
        if let Err(error) = result {
            warn!(error = %error, "chat_submit_failed");
            self.say(format!("Buddy can't chat right now: {error}"));
        }
    }

    fn forward_transcripts(&mut self) {
        while let Ok(transcript) = self.transcripts.try_recv() {
            info!(length = transcript.as_str().len(), "quiz_transcript_forwarded");
            self.submit_chat(ChatJob::QuizResults(transcript));
        }
    }

    fn drain_chat_events(&mut self) {
        let mut events = Vec::new();
        if let Some(chat) = &self.chat {
            while let Some(event) = chat.try_next_event() {
                events.push(event);
            }
        }
        for event in events {
            match event {
                ChatEvent::Reply(reply) => self.say(format!("Buddy: {reply}")),
                ChatEvent::QuizAbsorbed => debug!("quiz_results_absorbed"),
                ChatEvent::Failed(error) => self.say(format!("Buddy can't chat right now: {error}")),
            }
        }
    }

    fn say(&mut self, line: String) {
        self.console_lines.push(line);
    }

    fn flush_console(&mut self) {
        if !self.echo_to_stdout {
            return;
        }
        for line in self.console_lines.drain(..) {
            println!("{line}");
        }
    }

    fn publish_visuals(&self, world: &mut SceneWorld) {
        let active_page = self.navigator.active();
        let panels = self
            .panels
            .iter()
            .filter(|panel| panel.visible_on(active_page))
            .map(|panel| PanelVisual {
                name: panel.name.clone(),
                bounds: panel
                    .collidable
                    .as_ref()
                    .map_or(panel.bounds, |collidable| collidable.bounds()),
                collidable: panel.collidable.is_some(),
            })
            .collect();
        world.set_panels(panels);
        world.set_buddy(Some(BuddyVisual {
            body: self.buddy.body_rect(),
            scale: self.buddy.scale(),
            dragged: self.buddy.state() == LocomotionState::Dragged,
        }));
    }
}

impl Scene for CompanionScene {
    fn load(&mut self, world: &mut SceneWorld) {
        world.set_arena(self.layout.arena);
        self.build_panels();
        self.refresh_obstacles();
        self.buddy.obstacles_changed(&self.registry);
        self.apply_wander_policy();
        self.publish_visuals(world);
        info!(
            page = self.navigator.active(),
            panel_count = self.panels.len(),
            obstacle_count = self.registry.len(),
            question_count = self.quiz.len(),
            "scene_loaded"
        );
        self.say(format!(
            "[page: {}] type /help for commands",
            self.navigator.active()
        ));
        self.flush_console();
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.quit_requested() || input.was_pressed(InputAction::Quit) {
            return SceneCommand::Quit;
        }

        self.handle_keys(input);
        self.drain_console();
        self.forward_transcripts();
        self.drain_chat_events();
        self.handle_pointer(input);
        self.buddy.tick(fixed_dt_seconds, &self.registry);
        self.publish_visuals(world);
        self.flush_console();

        if self.quit_requested {
            SceneCommand::Quit
        } else {
            SceneCommand::None
        }
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        self.chat = None;
        self.console = None;
        self.panels.clear();
        self.registry.prune_stale();
        world.clear();
        info!("scene_unloaded");
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        let state = match self.buddy.state() {
            LocomotionState::Waiting { .. } => "waiting",
            LocomotionState::Wandering { .. } => "wandering",
            LocomotionState::Falling => "falling",
            LocomotionState::Dragged => "dragged",
        };
        let wander = if self.buddy.can_wander() { "on" } else { "off" };
        Some(format!(
            "Buddy | page: {} | {state} | wander: {wander}",
            self.navigator.active()
        ))
    }
}
