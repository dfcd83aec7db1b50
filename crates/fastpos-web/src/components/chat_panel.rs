//! Chat panel shared by the floating chatbot and the playground chat tab

use leptos::prelude::*;

use crate::api::{self, ChatTurn};

/// Message bubble component
#[component]
pub fn MessageBubble(turn: ChatTurn) -> impl IntoView {
    let class = if turn.is_user() {
        "message message-user"
    } else if turn.fallback {
        "message message-agent message-fallback"
    } else {
        "message message-agent"
    };

    view! {
        <div class=class>
            <p class="content">{turn.text}</p>
            <div class="links">
                {turn
                    .links
                    .into_iter()
                    .map(|link| {
                        view! {
                            <a href=link target="_blank" rel="noopener noreferrer">
                                "📍 Xem trên bản đồ"
                            </a>
                        }
                    })
                    .collect_view()}
            </div>
        </div>
    }
}

#[component]
pub fn ChatPanel(
    /// Server surface this panel talks to; `None` while it is being opened
    #[prop(into)]
    surface_id: Signal<Option<String>>,
    /// Starter questions shown on an empty conversation
    #[prop(into)]
    suggestions: Signal<Vec<String>>,
    greeting: &'static str,
    placeholder: &'static str,
) -> impl IntoView {
    let turns = RwSignal::new(Vec::<ChatTurn>::new());
    let input = RwSignal::new(String::new());
    let loading = RwSignal::new(false);

    let send = move || {
        let text = input.get_untracked().trim().to_string();
        if text.is_empty() || loading.get_untracked() {
            return;
        }
        let Some(id) = surface_id.get_untracked() else {
            return;
        };

        turns.update(|t| t.push(ChatTurn::user(text.clone())));
        input.set(String::new());
        loading.set(true);

        leptos::task::spawn_local(async move {
            match api::send_chat(&id, &text).await {
                Ok(view) => turns.set(view.turns),
                Err(e) => turns.update(|t| t.push(ChatTurn::fallback(e))),
            }
            loading.set(false);
        });
    };

    view! {
        <div class="chat-panel">
            <div class="messages">
                <Show when=move || turns.with(Vec::is_empty)>
                    <div class="greeting">
                        <p>{greeting}</p>
                        <div class="suggestions">
                            {move || {
                                suggestions
                                    .get()
                                    .into_iter()
                                    .map(|q| {
                                        let label = q.clone();
                                        view! {
                                            <button class="chip" on:click=move |_| input.set(q.clone())>
                                                {label}
                                            </button>
                                        }
                                    })
                                    .collect_view()
                            }}
                        </div>
                    </div>
                </Show>
                <For
                    each=move || turns.get().into_iter().enumerate()
                    key=|(i, turn)| (*i, turn.text.len())
                    children=move |(_, turn)| view! { <MessageBubble turn=turn /> }
                />
                <Show when=move || loading.get()>
                    <div class="message loading">"Đang tìm kiếm..."</div>
                </Show>
            </div>

            <div class="input-area">
                <input
                    type="text"
                    placeholder=placeholder
                    prop:value=move || input.get()
                    on:input=move |ev| input.set(event_target_value(&ev))
                    on:keydown=move |ev| {
                        if ev.key() == "Enter" {
                            ev.prevent_default();
                            send();
                        }
                    }
                />
                <button
                    on:click=move |_| send()
                    disabled=move || loading.get() || input.with(|i| i.trim().is_empty())
                >
                    "Gửi"
                </button>
            </div>
        </div>
    }
}
