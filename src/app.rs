//! eframe adapter for the overlay
//!
//! Translates toolkit input into `OverlayController` calls and controller
//! decisions into viewport commands. Holds no overlay state of its own.

use crossbeam_channel::Receiver;
use eframe::egui;
use egui::{PointerButton, Pos2, Rect, Sense, ViewportCommand, WindowLevel};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, HotkeyBackend};
use crate::hotkey::{GlobalListener, QuitChord};
use crate::overlay::visibility::{WindowAction, WindowObservation};
use crate::overlay::widgets::{command_button, ButtonStyle};
use crate::overlay::{OverlayConfig, OverlayController};
use crate::shared::{ui_channel, QuitSource, UiMessage};
use crate::shutdown::{
    flush_std_streams, run_quit_sequence, QuitLatch, QuitStep, QuitStepError, QuitSteps,
    QUIT_EXIT_CODE,
};

/// Ends the process with the given exit code
pub type ExitFn = Box<dyn FnMut(i32)>;

/// The overlay window application
pub struct OverlayApp {
    controller: OverlayController,
    chords: Vec<QuitChord>,
    listener: Option<GlobalListener>,
    messages: Receiver<UiMessage>,
    latch: QuitLatch,
    exit: ExitFn,
    start_style: ButtonStyle,
    stop_style: ButtonStyle,
    /// Start and Stop button rects from the last drawn frame
    button_rects: Vec<Rect>,
}

impl OverlayApp {
    /// Create the app and start the global listener. A listener that fails to
    /// start is logged; the in-window shortcut still works.
    pub fn new(
        ctx: &egui::Context,
        config: OverlayConfig,
        chords: Vec<QuitChord>,
        backend: HotkeyBackend,
    ) -> Self {
        let (post, messages) = ui_channel(Some(ctx.clone()));
        let listener = match GlobalListener::spawn(backend, &chords, post) {
            Ok(listener) => Some(listener),
            Err(e) => {
                error!("Global quit listener unavailable: {}", e);
                None
            }
        };

        // Skips destructors: the event loop is still running when this is called
        let exit: ExitFn = Box::new(|code: i32| {
            std::process::exit(code);
        });
        Self::with_parts(config, chords, listener, messages, exit)
    }

    fn with_parts(
        config: OverlayConfig,
        chords: Vec<QuitChord>,
        listener: Option<GlobalListener>,
        messages: Receiver<UiMessage>,
        exit: ExitFn,
    ) -> Self {
        Self {
            controller: OverlayController::new(config, Instant::now()),
            chords,
            listener,
            messages,
            latch: QuitLatch::new(),
            exit,
            start_style: ButtonStyle::start(),
            stop_style: ButtonStyle::stop(),
            button_rects: Vec::new(),
        }
    }

    /// Create eframe options for the overlay window
    pub fn options(config: &OverlayConfig) -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title(config.title.clone())
                .with_inner_size(config.size)
                .with_min_inner_size(config.size)
                .with_max_inner_size(config.size)
                .with_position(config.fallback_position)
                .with_resizable(false)
                .with_decorations(false)
                .with_always_on_top(),
            ..Default::default()
        }
    }

    /// One UI frame, shielded from panics, with the timer repaint scheduled
    fn run_frame(&mut self, ctx: &egui::Context) {
        // Keep a panic in one frame from taking the overlay down
        if panic::catch_unwind(AssertUnwindSafe(|| self.frame(ctx))).is_err() {
            error!("Frame aborted by a panic, overlay continues");
        }

        // Drives the visibility timer
        if let Some(delay) = self.controller.next_tick_in(Instant::now()) {
            ctx.request_repaint_after(delay);
        }
    }

    fn frame(&mut self, ctx: &egui::Context) {
        self.drain_messages(ctx);
        self.handle_local_keys(ctx);

        let obs = observe(ctx);
        self.place_and_sync(ctx);

        let actions = self.controller.observe_window(obs);
        apply_actions(ctx, &actions);
        let actions = self.controller.poll_timer(Instant::now(), obs);
        apply_actions(ctx, &actions);

        self.draw(ctx);
    }

    fn drain_messages(&mut self, ctx: &egui::Context) {
        while let Ok(message) = self.messages.try_recv() {
            match message {
                UiMessage::Quit(source) => self.quit(ctx, source),
            }
        }
    }

    fn handle_local_keys(&mut self, ctx: &egui::Context) {
        let chords = &self.chords;
        let pressed = ctx.input(|i| {
            i.events.iter().any(|event| match event {
                egui::Event::Key {
                    key,
                    pressed: true,
                    modifiers,
                    ..
                } => chords.iter().any(|c| c.matches_egui(*key, *modifiers)),
                _ => false,
            })
        });
        if pressed {
            self.quit(ctx, QuitSource::LocalKey);
        }
    }

    fn place_and_sync(&mut self, ctx: &egui::Context) {
        let (monitor_size, origin) =
            ctx.input(|i| (i.viewport().monitor_size, i.viewport().outer_rect.map(|r| r.min)));

        if let Some(size) = monitor_size {
            if let Some(pos) = self.controller.place_on_monitor(size) {
                ctx.send_viewport_cmd(ViewportCommand::OuterPosition(pos));
                return;
            }
        }
        if let Some(origin) = origin {
            self.controller.sync_position(origin);
        }
    }

    fn handle_drag(&mut self, ctx: &egui::Context, surface: &egui::Response) {
        let pointer = PointerFrame::read(ctx);

        if surface.drag_started_by(PointerButton::Primary) {
            let on_button = pointer
                .press_origin
                .is_some_and(|pos| self.button_rects.iter().any(|r| r.contains(pos)));
            match pointer.press_origin.and_then(|pos| pointer.to_screen(pos)) {
                Some(_) if on_button => debug!("press on a button, not dragging"),
                Some(start) => {
                    if let Err(e) = self.controller.drag_press(start) {
                        warn!("Drag press ignored: {}", e);
                    }
                }
                None => {}
            }
        }

        // A frame without pointer motion would pair a stale pointer with a
        // window origin that has since moved
        if self.controller.is_dragging() && surface.dragged_by(PointerButton::Primary) && pointer.moved {
            if let Some(current) = pointer.latest.and_then(|pos| pointer.to_screen(pos)) {
                match self.controller.drag_move(current) {
                    Ok(origin) if Some(origin) != pointer.window_origin => {
                        ctx.send_viewport_cmd(ViewportCommand::OuterPosition(origin))
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Drag move ignored: {}", e),
                }
            }
        }

        if surface.drag_stopped() {
            self.controller.drag_release();
        }
    }

    fn draw(&mut self, ctx: &egui::Context) {
        let panel = egui::Frame::none().fill(self.controller.color());
        egui::CentralPanel::default().frame(panel).show(ctx, |ui| {
            let surface = ui.interact(ui.max_rect(), ui.id().with("drag_surface"), Sense::drag());

            let mut start = None;
            let mut stop = None;
            egui::Frame::none().inner_margin(10.0).show(ui, |ui| {
                ui.horizontal_centered(|ui| {
                    start = Some(command_button(ui, "Start", &self.start_style));
                    stop = Some(command_button(ui, "Stop", &self.stop_style));
                });
            });

            self.button_rects = [&start, &stop]
                .into_iter()
                .flatten()
                .map(|response| response.rect)
                .collect();
            if start.is_some_and(|r| r.clicked()) {
                self.controller.start();
            }
            if stop.is_some_and(|r| r.clicked()) {
                self.controller.stop();
            }
            self.handle_drag(ctx, &surface);
        });
    }

    fn quit(&mut self, ctx: &egui::Context, source: QuitSource) {
        let mut steps = WindowQuit {
            ctx,
            controller: &mut self.controller,
            listener: &mut self.listener,
            exit: self.exit.as_mut(),
        };
        run_quit_sequence(&self.latch, source, &mut steps);
    }
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.run_frame(ctx);
    }
}

/// Pointer input for one frame, in window-local points unless noted
struct PointerFrame {
    /// Client-area origin on screen, as last reported by the OS
    client_origin: Option<Pos2>,
    /// Outer window origin on screen, as last reported by the OS
    window_origin: Option<Pos2>,
    latest: Option<Pos2>,
    press_origin: Option<Pos2>,
    /// A pointer motion event arrived this frame
    moved: bool,
}

impl PointerFrame {
    fn read(ctx: &egui::Context) -> Self {
        ctx.input(|i| {
            let vp = i.viewport();
            Self {
                client_origin: vp.inner_rect.map(|r| r.min),
                window_origin: vp.outer_rect.map(|r| r.min),
                latest: i.pointer.latest_pos(),
                press_origin: i.pointer.press_origin(),
                moved: i
                    .events
                    .iter()
                    .any(|e| matches!(e, egui::Event::PointerMoved(_))),
            }
        })
    }

    /// Local point to screen coordinates, using the real window position
    fn to_screen(&self, local: Pos2) -> Option<Pos2> {
        self.client_origin.map(|origin| origin + local.to_vec2())
    }
}

/// Quit steps carried out against the live window
struct WindowQuit<'a> {
    ctx: &'a egui::Context,
    controller: &'a mut OverlayController,
    listener: &'a mut Option<GlobalListener>,
    exit: &'a mut dyn FnMut(i32),
}

impl QuitSteps for WindowQuit<'_> {
    fn perform(&mut self, step: QuitStep) -> Result<(), QuitStepError> {
        match step {
            QuitStep::StopTimer => self.controller.stop_timer(),
            QuitStep::DetachListener => match self.listener.as_mut() {
                Some(listener) => {
                    debug!(backend = ?listener.backend(), attached = listener.is_attached(), "detaching listener");
                    listener.stop();
                }
                None => return Err(QuitStepError::new(step, "listener was never started")),
            },
            QuitStep::PermitClose => self.controller.permit_close(),
            QuitStep::CloseWindow => self.ctx.send_viewport_cmd(ViewportCommand::Visible(false)),
            QuitStep::FlushOutput => flush_std_streams()?,
            QuitStep::RequestShutdown => self.ctx.send_viewport_cmd(ViewportCommand::Close),
            QuitStep::Terminate => {
                info!("Terminating with exit code {}", QUIT_EXIT_CODE);
                // Viewport commands above are only applied after this frame,
                // which never ends
                let _ = flush_std_streams();
                (self.exit)(QUIT_EXIT_CODE);
            }
        }
        Ok(())
    }
}

/// What the toolkit reports about the root window this frame
fn observe(ctx: &egui::Context) -> WindowObservation {
    ctx.input(|i| {
        let vp = i.viewport();
        WindowObservation {
            close_requested: vp.close_requested(),
            minimized: vp.minimized.unwrap_or(false),
            // An unmapped window reports an empty client area
            hidden: vp.inner_rect.map(|r| r.area() <= 0.0).unwrap_or(false),
            focused: vp.focused,
        }
    })
}

fn apply_actions(ctx: &egui::Context, actions: &[WindowAction]) {
    for action in actions {
        let command = match action {
            WindowAction::CancelClose => ViewportCommand::CancelClose,
            WindowAction::Show => ViewportCommand::Visible(true),
            WindowAction::Restore => ViewportCommand::Minimized(false),
            WindowAction::Raise => ViewportCommand::WindowLevel(WindowLevel::AlwaysOnTop),
            WindowAction::Focus => ViewportCommand::Focus,
        };
        ctx.send_viewport_cmd(command);
    }
}

/// Run the overlay (blocking). Returns only if the event loop fails to start.
pub fn run_overlay(config: &AppConfig, chords: Vec<QuitChord>) -> Result<(), eframe::Error> {
    let overlay_config = OverlayConfig::from(config);
    let backend = config.hotkey.backend;
    let options = OverlayApp::options(&overlay_config);
    let title = overlay_config.title.clone();

    info!("Starting overlay \"{}\"", title);
    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| {
            let app = OverlayApp::new(&cc.egui_ctx, overlay_config, chords, backend);
            Ok(Box::new(app))
        }),
    )
}
