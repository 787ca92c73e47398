use crate::font::TextRenderer;
use crate::layout::{Layout, LayoutParams};
use crate::presenter::{Presenter, WindowController};
use crate::render;
use crate::sprite::Sprite;
use anyhow::{Context, Result};
use calloop::EventLoop;
use calloop::timer::{TimeoutAction, Timer};
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState, Region},
    delegate_compositor, delegate_layer, delegate_output, delegate_pointer, delegate_registry,
    delegate_seat, delegate_shm,
    output::{OutputHandler, OutputState},
    reexports::calloop_wayland_source::WaylandSource,
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::{
        Capability, SeatHandler, SeatState,
        pointer::{PointerEvent, PointerEventKind, PointerHandler},
    },
    shell::{
        WaylandSurface,
        wlr_layer::{
            Anchor, KeyboardInteractivity, Layer, LayerShell, LayerShellHandler, LayerSurface,
            LayerSurfaceConfigure,
        },
    },
    shm::{Shm, ShmHandler, slot::SlotPool},
};
use std::time::Duration;
use tiny_skia::Pixmap;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use wayland_client::{
    Connection, QueueHandle,
    globals::registry_queue_init,
    protocol::{wl_output, wl_pointer, wl_seat, wl_shm, wl_surface},
};

/// Linux input code for the left mouse button.
const BTN_LEFT: u32 = 0x110;

// ---- Public API ----

/// Everything the overlay needs, loaded before the window opens.
pub struct OverlayAssets {
    pub sprite: Sprite,
    pub text: TextRenderer,
    pub layout: LayoutParams,
    pub fps: u32,
}

/// Handle to a running overlay thread.
pub struct OverlayHandle {
    join: std::thread::JoinHandle<Result<()>>,
}

impl OverlayHandle {
    /// Block until the overlay closes, returning its error if it failed.
    pub fn join(self) -> Result<()> {
        match self.join.join() {
            Ok(result) => result,
            Err(_) => anyhow::bail!("overlay thread panicked"),
        }
    }
}

pub fn spawn_overlay(assets: OverlayAssets, rx: mpsc::Receiver<String>) -> Result<OverlayHandle> {
    let join = std::thread::Builder::new()
        .name("overlay".into())
        .spawn(move || run_overlay_thread(assets, rx))
        .context("failed to spawn overlay thread")?;
    Ok(OverlayHandle { join })
}

// ---- Window binding ----

/// A layer-shell surface treated as a movable window. The position is the
/// surface's top/left margin on a `TOP | LEFT` anchor.
struct LayerWindow {
    layer: LayerSurface,
    compositor: CompositorState,
    position: (i32, i32),
    size: (u32, u32),
    /// Last surface-local pointer position.
    pointer: (f64, f64),
    pressed: bool,
    input_rect: Option<(i32, i32, i32, i32)>,
}

impl LayerWindow {
    /// Accept pointer input only over `layout`'s sprite.
    fn update_input_region(&mut self, layout: &Layout) {
        let s = &layout.sprite;
        let rect = (
            s.x.floor() as i32,
            s.y.floor() as i32,
            s.width.ceil() as i32 + 1,
            s.height.ceil() as i32 + 1,
        );
        if self.input_rect == Some(rect) {
            return;
        }
        match Region::new(&self.compositor) {
            Ok(region) => {
                region.add(rect.0, rect.1, rect.2, rect.3);
                self.layer.wl_surface().set_input_region(Some(region.wl_region()));
                self.input_rect = Some(rect);
            }
            Err(e) => warn!(error = %e, "failed to create input region"),
        }
    }
}

impl WindowController for LayerWindow {
    fn set_size(&mut self, width: u32, height: u32) {
        if self.size != (width, height) {
            self.size = (width, height);
            self.layer.set_size(width, height);
        }
    }

    fn set_position(&mut self, x: i32, y: i32) {
        let (dx, dy) = (x - self.position.0, y - self.position.1);
        if dx == 0 && dy == 0 {
            return;
        }
        // The pointer has not moved on screen, so it moved the other way
        // relative to the surface.
        self.pointer.0 -= dx as f64;
        self.pointer.1 -= dy as f64;
        self.position = (x, y);
        self.layer.set_margin(y, 0, 0, x);
    }

    fn position(&self) -> (i32, i32) {
        self.position
    }

    fn cursor_position(&self) -> (i32, i32) {
        (self.pointer.0.floor() as i32, self.pointer.1.floor() as i32)
    }

    fn is_primary_pressed(&self) -> bool {
        self.pressed
    }
}

// ---- Overlay state ----

struct OverlayState {
    registry_state: RegistryState,
    output_state: OutputState,
    seat_state: SeatState,
    shm: Shm,
    pool: SlotPool,
    window: LayerWindow,
    pointer: Option<wl_pointer::WlPointer>,
    presenter: Presenter,
    sprite: Sprite,
    text: TextRenderer,
    rx: mpsc::Receiver<String>,
    configured: bool,
    done: bool,
}

fn run_overlay_thread(assets: OverlayAssets, rx: mpsc::Receiver<String>) -> Result<()> {
    info!("overlay thread starting");

    let OverlayAssets { sprite, mut text, layout, fps } = assets;
    let presenter = Presenter::new(sprite.natural_size(), layout, fps, &mut text);

    let conn = Connection::connect_to_env().context("failed to connect to Wayland")?;
    let (globals, mut event_queue) = registry_queue_init(&conn)?;
    let qh = event_queue.handle();

    let compositor =
        CompositorState::bind(&globals, &qh).context("wl_compositor not available")?;
    let layer_shell =
        LayerShell::bind(&globals, &qh).context("wlr-layer-shell not available")?;
    let shm = Shm::bind(&globals, &qh).context("wl_shm not available")?;

    let surface = compositor.create_surface(&qh);
    let layer =
        layer_shell.create_layer_surface(&qh, surface, Layer::Overlay, Some("bubbletalk"), None);
    layer.set_anchor(Anchor::TOP | Anchor::LEFT);
    layer.set_exclusive_zone(-1);
    layer.set_keyboard_interactivity(KeyboardInteractivity::None);

    let (width, height) = presenter.layout().window_size();
    layer.set_size(width, height);

    let pool = SlotPool::new((width * height * 4) as usize, &shm)
        .context("failed to create shm pool")?;

    let mut state = OverlayState {
        registry_state: RegistryState::new(&globals),
        output_state: OutputState::new(&globals, &qh),
        seat_state: SeatState::new(&globals, &qh),
        shm,
        pool,
        window: LayerWindow {
            layer,
            compositor,
            position: (0, 0),
            size: (width, height),
            pointer: (0.0, 0.0),
            pressed: false,
            input_rect: None,
        },
        pointer: None,
        presenter,
        sprite,
        text,
        rx,
        configured: false,
        done: false,
    };

    // Learn the output sizes before placing the window.
    event_queue.roundtrip(&mut state)?;
    state.place_bottom_right();
    state.window.update_input_region(state.presenter.layout());
    state.window.layer.commit();

    let mut event_loop: EventLoop<OverlayState> =
        EventLoop::try_new().context("failed to create event loop")?;
    WaylandSource::new(conn.clone(), event_queue)
        .insert(event_loop.handle())
        .map_err(|e| e.error)
        .context("failed to register Wayland source")?;

    let frame = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
    event_loop
        .handle()
        .insert_source(Timer::immediate(), move |_, _, state| {
            state.tick();
            TimeoutAction::ToDuration(frame)
        })
        .map_err(|e| e.error)
        .context("failed to register frame timer")?;

    while !state.done {
        event_loop.dispatch(None, &mut state)?;
    }

    info!("overlay thread finished");
    Ok(())
}

impl OverlayState {
    /// Put the window's bottom-right corner on the first output's corner.
    fn place_bottom_right(&mut self) {
        let (width, height) = self.window.size;
        let monitor = self
            .output_state
            .outputs()
            .filter_map(|o| self.output_state.info(&o))
            .find_map(|info| info.logical_size);
        match monitor {
            Some((mw, mh)) => {
                let x = mw - width as i32;
                let y = mh - height as i32;
                info!(monitor_width = mw, monitor_height = mh, x, y, "placing overlay");
                self.window.set_position(x, y);
            }
            None => warn!("no output size known, placing overlay at origin"),
        }
    }

    /// One tick: presenter update, then draw.
    fn tick(&mut self) {
        if !self.configured {
            return;
        }
        let incoming = self.rx.try_recv().ok();
        self.presenter.update(incoming, &mut self.window, &mut self.text);
        self.window.update_input_region(self.presenter.layout());
        trace!(
            message = self.presenter.has_message(),
            frames_left = self.presenter.message_timer(),
            dragging = self.presenter.is_dragging(),
            "frame"
        );

        if let Err(e) = self.draw() {
            warn!(error = %e, "failed to draw frame");
        }
    }

    fn draw(&mut self) -> Result<()> {
        let (width, height) = self.presenter.layout().window_size();
        let mut pixmap = Pixmap::new(width, height).context("zero-sized frame")?;
        render::draw_frame(&mut pixmap, &self.presenter, &self.sprite, &mut self.text);

        let stride = width as i32 * 4;
        let buf_size = (stride * height as i32) as usize;
        if self.pool.len() < buf_size {
            self.pool.resize(buf_size).context("failed to grow shm pool")?;
        }
        let (buffer, canvas) = self
            .pool
            .create_buffer(width as i32, height as i32, stride, wl_shm::Format::Argb8888)
            .context("failed to create buffer")?;
        render::copy_to_argb(&pixmap, canvas);

        let surface = self.window.layer.wl_surface();
        surface.damage_buffer(0, 0, width as i32, height as i32);
        buffer.attach_to(surface).context("failed to attach buffer")?;
        self.window.layer.commit();
        Ok(())
    }
}

// ---- Trait implementations ----

impl CompositorHandler for OverlayState {
    fn scale_factor_changed(
        &mut self, _conn: &Connection, _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface, _new_factor: i32,
    ) {}
    fn transform_changed(
        &mut self, _conn: &Connection, _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface, _new_transform: wl_output::Transform,
    ) {}
    fn frame(
        &mut self, _conn: &Connection, _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface, _time: u32,
    ) {}
    fn surface_enter(
        &mut self, _conn: &Connection, _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface, _output: &wl_output::WlOutput,
    ) {}
    fn surface_leave(
        &mut self, _conn: &Connection, _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface, _output: &wl_output::WlOutput,
    ) {}
}

impl OutputHandler for OverlayState {
    fn output_state(&mut self) -> &mut OutputState { &mut self.output_state }
    fn new_output(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_output::WlOutput) {}
    fn update_output(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_output::WlOutput) {}
    fn output_destroyed(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_output::WlOutput) {}
}

impl LayerShellHandler for OverlayState {
    fn closed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _layer: &LayerSurface) {
        info!("overlay surface closed by compositor");
        self.done = true;
    }
    fn configure(
        &mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _layer: &LayerSurface,
        configure: LayerSurfaceConfigure, _serial: u32,
    ) {
        debug!(width = configure.new_size.0, height = configure.new_size.1, "configured");
        if !self.configured {
            self.configured = true;
            if let Err(e) = self.draw() {
                warn!(error = %e, "failed to draw first frame");
            }
        }
    }
}

impl SeatHandler for OverlayState {
    fn seat_state(&mut self) -> &mut SeatState { &mut self.seat_state }
    fn new_seat(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_seat::WlSeat) {}
    fn new_capability(
        &mut self, _conn: &Connection, qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat, capability: Capability,
    ) {
        if capability == Capability::Pointer && self.pointer.is_none() {
            match self.seat_state.get_pointer(qh, &seat) {
                Ok(pointer) => self.pointer = Some(pointer),
                Err(e) => warn!(error = %e, "failed to get pointer"),
            }
        }
    }
    fn remove_capability(
        &mut self, _conn: &Connection, _qh: &QueueHandle<Self>,
        _seat: wl_seat::WlSeat, capability: Capability,
    ) {
        if capability == Capability::Pointer {
            if let Some(pointer) = self.pointer.take() {
                pointer.release();
            }
            self.window.pressed = false;
        }
    }
    fn remove_seat(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_seat::WlSeat) {}
}

impl PointerHandler for OverlayState {
    fn pointer_frame(
        &mut self, _conn: &Connection, _qh: &QueueHandle<Self>,
        _pointer: &wl_pointer::WlPointer, events: &[PointerEvent],
    ) {
        for event in events {
            if &event.surface != self.window.layer.wl_surface() {
                continue;
            }
            match event.kind {
                PointerEventKind::Enter { .. } | PointerEventKind::Motion { .. } => {
                    self.window.pointer = event.position;
                }
                PointerEventKind::Press { button: BTN_LEFT, .. } => {
                    self.window.pointer = event.position;
                    self.window.pressed = true;
                }
                PointerEventKind::Release { button: BTN_LEFT, .. }
                | PointerEventKind::Leave { .. } => {
                    self.window.pressed = false;
                }
                _ => {}
            }
        }
    }
}

impl ShmHandler for OverlayState {
    fn shm_state(&mut self) -> &mut Shm { &mut self.shm }
}

delegate_compositor!(OverlayState);
delegate_output!(OverlayState);
delegate_shm!(OverlayState);
delegate_layer!(OverlayState);
delegate_seat!(OverlayState);
delegate_pointer!(OverlayState);
delegate_registry!(OverlayState);

impl ProvidesRegistryState for OverlayState {
    fn registry(&mut self) -> &mut RegistryState { &mut self.registry_state }
    registry_handlers![OutputState, SeatState];
}
