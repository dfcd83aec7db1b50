//! Floating Chatbot

use leptos::prelude::*;

use super::ChatPanel;
use crate::api;

/// Corner chat widget. The server surface is opened on first use and kept
/// until the page is hidden; minimising only hides the window.
#[component]
pub fn FloatingChatbot() -> impl IntoView {
    let open = RwSignal::new(false);
    let surface_id = RwSignal::new(None::<String>);
    let suggestions = RwSignal::new(Vec::<String>::new());
    let error = RwSignal::new(None::<String>);
    let opening_surface = RwSignal::new(false);
    let lease = api::SurfaceLease::scoped();

    let toggle = move |_| {
        let opening = !open.get_untracked();
        open.set(opening);
        if opening && !lease.is_attached() && !opening_surface.get_untracked() {
            opening_surface.set(true);
            let lease = lease.clone();
            leptos::task::spawn_local(async move {
                match api::open_surface("chatbot").await {
                    Ok(info) => {
                        if lease.attach(info.id.clone()) {
                            suggestions.set(info.chat.suggestions);
                            surface_id.set(Some(info.id));
                            error.set(None);
                        }
                    }
                    Err(e) => error.set(Some(e)),
                }
                opening_surface.set(false);
            });
        }
    };

    view! {
        <button class="chatbot-toggle" class:open=move || open.get() on:click=toggle.clone() aria-label="Open Chat">
            {move || if open.get() { "✕" } else { "💬" }}
        </button>

        <div class="chatbot-window" class:hidden=move || !open.get()>
            <header class="chatbot-header">
                <div>
                    <h3>"FastPOS AI"</h3>
                    <p class="status">"● Online"</p>
                </div>
                <button class="minimize" on:click=toggle>"—"</button>
            </header>

            {move || error.get().map(|e| view! { <p class="error">{e}</p> })}

            <ChatPanel
                surface_id=surface_id
                suggestions=suggestions
                greeting="Xin chào! Tôi là trợ lý ảo FastPOS. Bạn cần tư vấn về tính năng nào?"
                placeholder="Hỏi tôi bất cứ điều gì..."
            />

            <p class="powered-by">"Powered by Gemini 2.5 Flash"</p>
        </div>
    }
}
