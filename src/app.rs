//! DOM view and event wiring.
//!
//! Both screens are built once at startup and toggled by `display`; every render
//! only rewrites text, the button state and (when a new burst starts) the
//! particle layer. Timers advance from the `requestAnimationFrame` loop.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlButtonElement, window};

use crate::log;
use crate::random::CryptoRandom;
use crate::session::{Outcome, Screen, Session};
use crate::storage::{KeyValueStore, LocalStorage, MemoryStore};

const ROOT_ID: &str = "matayoshi-root";
const FOOTER: &str = "© 2025 Matayoshi Simulation.";

const FALL_CSS: &str = "\
.mt-poop{position:absolute;top:-64px;pointer-events:none;user-select:none;\
animation-name:mt-fall;animation-timing-function:linear;animation-fill-mode:forwards;}\
@keyframes mt-fall{to{transform:translateY(110vh) rotate(360deg);}}";

const PLAY_STYLE: &str = "min-height:100vh; width:100%; display:flex; flex-direction:column; \
align-items:center; justify-content:center; background:linear-gradient(#fef9c3,#ffedd5); \
padding:24px; position:relative; overflow:hidden; box-sizing:border-box; font-family:sans-serif;";
const RESULT_STYLE: &str = "min-height:100vh; display:flex; flex-direction:column; \
align-items:center; justify-content:center; background:#fffbeb; text-align:center; \
font-family:sans-serif;";
const HIDDEN: &str = "display:none;";
const BUTTON_ON: &str = "padding:16px 32px; border:none; border-radius:999px; font-size:20px; \
font-weight:bold; background:#d97706; color:#fff; cursor:pointer; \
box-shadow:0 6px 14px rgba(0,0,0,0.18);";
const BUTTON_OFF: &str = "padding:16px 32px; border:none; border-radius:999px; font-size:20px; \
font-weight:bold; background:#9ca3af; color:#fff; cursor:not-allowed;";
const RESET_STYLE: &str = "padding:12px 24px; border:none; border-radius:12px; font-size:18px; \
font-weight:600; background:#d97706; color:#fff; cursor:pointer;";
const STAT_STYLE: &str = "border-radius:12px; background:rgba(255,255,255,0.7); padding:16px; \
box-shadow:0 1px 3px rgba(0,0,0,0.08);";
const GRID_STYLE: &str = "display:grid; grid-template-columns:repeat(3,1fr); gap:12px; \
margin-top:32px; width:288px; text-align:center;";
const FOOTER_STYLE: &str = "margin-top:32px; font-size:12px; color:#6b7280;";

struct View {
    play: Element,
    result: Element,
    draw_btn: HtmlButtonElement,
    reset_btn: HtmlButtonElement,
    last_label: Element,
    tries: Element,
    hits: Element,
    safes: Element,
    particles: Element,
    result_msg: Element,
    // First particle id of the burst currently in the DOM.
    shown_burst: Option<u64>,
}

struct App {
    session: Session,
    view: View,
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

pub fn start_app() -> Result<(), JsValue> {
    if APP.with(|cell| cell.borrow().is_some()) {
        return Ok(());
    }
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let root = mount_root(&doc)?;

    let store: Box<dyn KeyValueStore> = match LocalStorage::open() {
        Ok(s) => Box::new(s),
        Err(e) => {
            log::warn(&format!("{e}; progress will not survive a reload"));
            Box::new(MemoryStore::new())
        }
    };
    let session = Session::load(store, Box::new(CryptoRandom));

    let mut view = View::build(&doc, &root)?;
    view.render(&session);
    attach_listeners(&view)?;

    APP.with(|cell| cell.replace(Some(App { session, view })));
    start_frame_loop();
    Ok(())
}

fn mount_root(doc: &Document) -> Result<Element, JsValue> {
    if let Some(el) = doc.get_element_by_id(ROOT_ID) {
        return Ok(el);
    }
    let body = doc.body().ok_or_else(|| JsValue::from_str("no body"))?;
    let el = doc.create_element("div")?;
    el.set_id(ROOT_ID);
    body.append_child(&el)?;
    Ok(el)
}

fn node(doc: &Document, tag: &str, style: &str, text: &str) -> Result<Element, JsValue> {
    let el = doc.create_element(tag)?;
    if !style.is_empty() {
        el.set_attribute("style", style)?;
    }
    if !text.is_empty() {
        el.set_text_content(Some(text));
    }
    Ok(el)
}

/// Builds a node and appends it to `parent`, returning the new element.
fn add(
    doc: &Document,
    parent: &Element,
    tag: &str,
    style: &str,
    text: &str,
) -> Result<Element, JsValue> {
    let el = node(doc, tag, style, text)?;
    parent.append_child(&el)?;
    Ok(el)
}

fn set_style(el: &Element, style: &str) {
    if let Err(e) = el.set_attribute("style", style) {
        log::warn(&format!("could not restyle <{}>: {e:?}", el.tag_name()));
    }
}

fn stat_tile(doc: &Document, grid: &Element, label: &str) -> Result<Element, JsValue> {
    let tile = add(doc, grid, "div", STAT_STYLE, "")?;
    add(doc, &tile, "p", "margin:0; font-size:12px; color:#4b5563;", label)?;
    add(doc, &tile, "p", "margin:4px 0 0; font-size:24px; font-weight:600;", "0")
}

impl View {
    fn build(doc: &Document, root: &Element) -> Result<Self, JsValue> {
        let css = doc.create_element("style")?;
        css.set_text_content(Some(FALL_CSS));
        root.append_child(&css)?;

        // --- Play screen ---
        let play = add(doc, root, "div", PLAY_STYLE, "")?;
        let particles = add(
            doc,
            &play,
            "div",
            "position:absolute; inset:0; pointer-events:none;",
            "",
        )?;
        add(
            doc,
            &play,
            "h1",
            "font-size:36px; font-weight:800; margin:0 0 16px; color:#92400e;",
            "💩 マタヨシ",
        )?;
        add(
            doc,
            &play,
            "p",
            "color:#374151; margin:0 0 32px;",
            &format!("ボタンを押すと 1/{} の確率でうんこを漏らします。", crate::CHANCE),
        )?;

        let draw_btn: HtmlButtonElement = doc.create_element("button")?.dyn_into()?;
        draw_btn.set_text_content(Some(&format!("抽選する（1/{}）", crate::CHANCE)));
        play.append_child(&draw_btn)?;

        let last_box = add(doc, &play, "div", "margin-top:32px; text-align:center;", "")?;
        add(
            doc,
            &last_box,
            "p",
            "font-size:14px; color:#4b5563; margin:0 0 8px;",
            "直近の結果：",
        )?;
        let last_label = add(doc, &last_box, "p", "", "")?;

        let grid = add(doc, &play, "div", GRID_STYLE, "")?;
        let tries = stat_tile(doc, &grid, "試行回数")?;
        let hits = stat_tile(doc, &grid, "漏らした回数")?;
        let safes = stat_tile(doc, &grid, "セーフ回数")?;
        add(doc, &play, "footer", FOOTER_STYLE, FOOTER)?;

        // --- Result screen ---
        let result = add(doc, root, "div", HIDDEN, "")?;
        add(
            doc,
            &result,
            "h1",
            "font-size:48px; font-weight:800; margin:0 0 24px; color:#92400e;",
            "💩 終了！",
        )?;
        let result_msg = add(
            doc,
            &result,
            "p",
            "font-size:24px; color:#1f2937; margin:0 0 32px;",
            "",
        )?;
        let reset_btn: HtmlButtonElement = doc.create_element("button")?.dyn_into()?;
        reset_btn.set_text_content(Some("もう一度挑戦"));
        reset_btn.set_attribute("style", RESET_STYLE)?;
        result.append_child(&reset_btn)?;
        add(doc, &result, "footer", FOOTER_STYLE, FOOTER)?;

        Ok(Self {
            play,
            result,
            draw_btn,
            reset_btn,
            last_label,
            tries,
            hits,
            safes,
            particles,
            result_msg,
            shown_burst: None,
        })
    }

    fn render(&mut self, session: &Session) {
        let st = session.state();
        match session.screen() {
            Screen::Play => {
                set_style(&self.play, PLAY_STYLE);
                set_style(&self.result, HIDDEN);
            }
            Screen::Result {
                first_success_attempt,
            } => {
                set_style(&self.play, HIDDEN);
                set_style(&self.result, RESULT_STYLE);
                self.result_msg.set_text_content(Some(&format!(
                    "{first_success_attempt}日目で漏らしました！"
                )));
            }
        }

        let can_draw = session.can_draw();
        self.draw_btn.set_disabled(!can_draw);
        set_style(&self.draw_btn, if can_draw { BUTTON_ON } else { BUTTON_OFF });

        let (text, color) = match st.last_outcome {
            Some(Outcome::Hit) => ("💩 うんこを漏らした！！！", "#dc2626"),
            Some(Outcome::Miss) => ("🚽 間に合った", "#374151"),
            None => ("未実行", "#9ca3af"),
        };
        self.last_label.set_text_content(Some(text));
        set_style(
            &self.last_label,
            &format!("margin:0; font-size:30px; font-weight:bold; color:{color};"),
        );

        self.tries.set_text_content(Some(&st.attempts.to_string()));
        self.hits.set_text_content(Some(&st.success_count.to_string()));
        self.safes.set_text_content(Some(&st.failure_count.to_string()));

        self.render_particles(session);
    }

    // Rewriting the layer restarts the CSS animation, so only do it per burst.
    fn render_particles(&mut self, session: &Session) {
        let particles = session.burst().particles();
        let key = particles.first().map(|p| p.id);
        if key == self.shown_burst {
            return;
        }
        let mut html = String::new();
        for p in particles {
            html.push_str(&format!(
                "<span class='mt-poop' data-id='{}' \
                 style='left:{:.2}%;font-size:{:.1}px;animation-duration:{:.2}s;'>💩</span>",
                p.id, p.left, p.size, p.duration
            ));
        }
        self.particles.set_inner_html(&html);
        self.shown_burst = key;
    }
}

fn now_ms() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

fn attach_listeners(view: &View) -> Result<(), JsValue> {
    {
        let closure = Closure::wrap(Box::new(move |_evt: web_sys::MouseEvent| {
            let now = now_ms();
            APP.with(|cell| {
                if let Some(app) = cell.borrow_mut().as_mut() {
                    if app.session.draw(now).is_some() {
                        app.view.render(&app.session);
                    }
                }
            });
        }) as Box<dyn FnMut(_)>);
        view.draw_btn
            .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let closure = Closure::wrap(Box::new(move |_evt: web_sys::MouseEvent| {
            APP.with(|cell| {
                if let Some(app) = cell.borrow_mut().as_mut() {
                    app.session.reset();
                    app.view.render(&app.session);
                }
            });
            // A full reload restarts from a clean page; the reset state above
            // covers the case where the reload is refused.
            if let Some(w) = window() {
                if let Err(e) = w.location().reload() {
                    log::warn(&format!("reload failed: {e:?}"));
                }
            }
        }) as Box<dyn FnMut(_)>);
        view.reset_btn
            .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    Ok(())
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn start_frame_loop() {
    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        APP.with(|cell| {
            if let Some(app) = cell.borrow_mut().as_mut() {
                if app.session.tick(ts) {
                    app.view.render(&app.session);
                }
            }
        });
        request_frame(&f);
    }) as Box<dyn FnMut(f64)>));
    request_frame(&g);
}

fn request_frame(cb: &FrameCallback) {
    if let (Some(w), Some(c)) = (window(), cb.borrow().as_ref()) {
        let _ = w.request_animation_frame(c.as_ref().unchecked_ref());
    }
}
