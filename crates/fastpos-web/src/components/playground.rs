//! AI Playground Modal
//!
//! Chat, image editing and video generation tabs over one playground surface.
//! The surface is opened on mount and closed when the modal unmounts, which
//! stops any running video poll on the server.

use leptos::prelude::*;
use web_sys::HtmlInputElement;

use super::ChatPanel;
use crate::api;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tab {
    Chat,
    Image,
    Video,
}

impl Tab {
    fn as_str(self) -> &'static str {
        match self {
            Tab::Chat => "chat",
            Tab::Image => "image",
            Tab::Video => "video",
        }
    }
}

fn picked_file(ev: &leptos::ev::Event) -> Option<web_sys::File> {
    let input: HtmlInputElement = event_target(ev);
    input.files().and_then(|files| files.get(0))
}

#[component]
pub fn Playground(on_close: Callback<()>) -> impl IntoView {
    let surface_id = RwSignal::new(None::<String>);
    let tab = RwSignal::new(Tab::Chat);
    let error = RwSignal::new(None::<String>);

    // Unmounting releases the lease, which closes the surface even if it
    // is still being opened
    let lease = api::SurfaceLease::scoped();
    leptos::task::spawn_local(async move {
        match api::open_surface("playground").await {
            Ok(info) => {
                if lease.attach(info.id.clone()) {
                    surface_id.set(Some(info.id));
                }
            }
            Err(e) => error.set(Some(e)),
        }
    });

    let close = move |_| on_close.run(());

    let switch = move |next: Tab| {
        tab.set(next);
        if let Some(id) = surface_id.get_untracked() {
            leptos::task::spawn_local(async move {
                let _ = api::select_tab(&id, next.as_str()).await;
            });
        }
    };

    let tab_button = move |label: &'static str, target: Tab| {
        view! {
            <button class="tab" class:active=move || tab.get() == target on:click=move |_| switch(target)>
                {label}
            </button>
        }
    };

    view! {
        <div class="modal-backdrop">
            <div class="modal playground">
                <header class="playground-header">
                    <h2>"✨ FastPOS AI Playground"</h2>
                    <button class="modal-close" on:click=close>"✕"</button>
                </header>

                <nav class="tabs">
                    {tab_button("💬 Trợ lý AI", Tab::Chat)}
                    {tab_button("🖼️ Chỉnh sửa ảnh", Tab::Image)}
                    {tab_button("🎬 Tạo video", Tab::Video)}
                </nav>

                {move || error.get().map(|e| view! { <p class="error">{e}</p> })}

                // Tabs stay mounted so switching keeps their state
                <section class:hidden=move || tab.get() != Tab::Chat>
                    <ChatPanel
                        surface_id=surface_id
                        suggestions=Signal::derive(Vec::new)
                        greeting="Chào bạn! Tôi có thể giúp gì cho bạn về FastPOS?"
                        placeholder="Nhập câu hỏi của bạn..."
                    />
                </section>
                <section class:hidden=move || tab.get() != Tab::Image>
                    <ImageTab surface_id=surface_id />
                </section>
                <section class:hidden=move || tab.get() != Tab::Video>
                    <VideoTab surface_id=surface_id />
                </section>
            </div>
        </div>
    }
}

#[component]
fn ImageTab(#[prop(into)] surface_id: Signal<Option<String>>) -> impl IntoView {
    let preview = RwSignal::new(None::<String>);
    let result = RwSignal::new(None::<String>);
    let prompt = RwSignal::new(String::new());
    let loading = RwSignal::new(false);
    let error = RwSignal::new(None::<String>);

    let on_pick = move |ev: leptos::ev::Event| {
        let (Some(file), Some(id)) = (picked_file(&ev), surface_id.get_untracked()) else {
            return;
        };
        error.set(None);
        leptos::task::spawn_local(async move {
            match api::upload(&id, "image", file).await {
                Ok(info) => {
                    preview.set(Some(info.preview_url));
                    result.set(None);
                }
                Err(e) => error.set(Some(e)),
            }
        });
    };

    let generate = move |_| {
        let Some(id) = surface_id.get_untracked() else {
            return;
        };
        let text = prompt.get_untracked();
        loading.set(true);
        error.set(None);
        leptos::task::spawn_local(async move {
            match api::edit_image(&id, &text).await {
                Ok(url) => result.set(Some(url)),
                Err(e) => error.set(Some(e)),
            }
            loading.set(false);
        });
    };

    view! {
        <div class="image-tab">
            <input type="file" accept="image/*" on:change=on_pick />
            <div class="image-pair">
                {move || preview.get().map(|src| view! { <img class="preview" src=src alt="Ảnh gốc" /> })}
                {move || result.get().map(|src| view! { <img class="result" src=src alt="Ảnh đã chỉnh sửa" /> })}
            </div>
            <input
                type="text"
                placeholder="Ví dụ: Thêm hiệu ứng retro, xóa phông nền..."
                prop:value=move || prompt.get()
                on:input=move |ev| prompt.set(event_target_value(&ev))
            />
            {move || error.get().map(|e| view! { <p class="error">{e}</p> })}
            <button
                class="btn btn-primary"
                on:click=generate
                disabled=move || loading.get() || preview.with(Option::is_none) || prompt.with(|p| p.trim().is_empty())
            >
                {move || if loading.get() { "Đang xử lý..." } else { "Chỉnh sửa ảnh" }}
            </button>
        </div>
    }
}

#[component]
fn VideoTab(#[prop(into)] surface_id: Signal<Option<String>>) -> impl IntoView {
    let credential = RwSignal::new("checking".to_string());
    let preview = RwSignal::new(None::<String>);
    let video = RwSignal::new(None::<String>);
    let loading = RwSignal::new(false);
    let error = RwSignal::new(None::<String>);

    // Check the credential as soon as the surface exists
    Effect::new(move |_| {
        if let Some(id) = surface_id.get() {
            leptos::task::spawn_local(async move {
                let state = api::credential_state(&id).await.unwrap_or_else(|_| "missing".into());
                credential.set(state);
            });
        }
    });

    let select_key = move |_| {
        let Some(id) = surface_id.get_untracked() else {
            return;
        };
        leptos::task::spawn_local(async move {
            let state = api::request_credential(&id).await.unwrap_or_else(|_| "missing".into());
            credential.set(state);
        });
    };

    let on_pick = move |ev: leptos::ev::Event| {
        let (Some(file), Some(id)) = (picked_file(&ev), surface_id.get_untracked()) else {
            return;
        };
        error.set(None);
        leptos::task::spawn_local(async move {
            match api::upload(&id, "video", file).await {
                Ok(info) => {
                    preview.set(Some(info.preview_url));
                    video.set(None);
                }
                Err(e) => error.set(Some(e)),
            }
        });
    };

    let generate = move |_| {
        let Some(id) = surface_id.get_untracked() else {
            return;
        };
        loading.set(true);
        error.set(None);
        leptos::task::spawn_local(async move {
            match api::generate_video(&id).await {
                Ok(url) => video.set(Some(url)),
                Err(e) => {
                    // A rejected key sends the visitor back to key selection
                    if let Ok(state) = api::credential_state(&id).await {
                        credential.set(state);
                    }
                    error.set(Some(e));
                }
            }
            loading.set(false);
        });
    };

    view! {
        <div class="video-tab">
            {move || match credential.get().as_str() {
                "checking" => view! { <p class="loading">"Đang kiểm tra API Key..."</p> }.into_any(),
                "available" => view! {
                    <div>
                        <input type="file" accept="image/*" on:change=on_pick />
                        {move || preview.get().map(|src| view! { <img class="preview" src=src alt="Ảnh gốc" /> })}
                        {move || error.get().map(|e| view! { <p class="error">{e}</p> })}
                        <button
                            class="btn btn-primary"
                            on:click=generate
                            disabled=move || loading.get() || preview.with(Option::is_none)
                        >
                            {move || if loading.get() { "Đang tạo video (có thể mất vài phút)..." } else { "Tạo video" }}
                        </button>
                        {move || video.get().map(|src| view! { <video class="result" src=src controls=true autoplay=true /> })}
                    </div>
                }
                .into_any(),
                _ => view! {
                    <div class="credential-required">
                        <p>"Yêu cầu API Key trả phí."</p>
                        <p class="hint">"Tính năng tạo video cần API Key có bật thanh toán."</p>
                        <button class="btn btn-primary" on:click=select_key>"Chọn API Key"</button>
                    </div>
                }
                .into_any(),
            }}
        </div>
    }
}
