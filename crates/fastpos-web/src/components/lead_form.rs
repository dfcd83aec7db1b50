//! Lead Form Modal

use leptos::prelude::*;

use crate::api::{self, LeadRequest};

#[derive(Clone, Debug, PartialEq)]
enum Step {
    Form,
    Success(String),
}

/// Consultation request form. `source` names the button that opened it.
#[component]
pub fn LeadFormModal(#[prop(into)] source: Signal<String>, on_close: Callback<()>) -> impl IntoView {
    let name = RwSignal::new(String::new());
    let email = RwSignal::new(String::new());
    let phone = RwSignal::new(String::new());
    let company = RwSignal::new(String::new());
    let note = RwSignal::new(String::new());

    let step = RwSignal::new(Step::Form);
    let loading = RwSignal::new(false);
    let error = RwSignal::new(None::<String>);

    let submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if loading.get_untracked() {
            return;
        }
        let request = LeadRequest {
            name: name.get_untracked(),
            email: email.get_untracked(),
            phone: phone.get_untracked(),
            company: company.get_untracked(),
            note: note.get_untracked(),
            source: source.get_untracked(),
        };
        loading.set(true);
        error.set(None);

        leptos::task::spawn_local(async move {
            match api::submit_lead(&request).await {
                Ok(confirmation) => step.set(Step::Success(confirmation)),
                Err(e) => error.set(Some(e)),
            }
            loading.set(false);
        });
    };

    let field = move |label: &'static str, kind: &'static str, value: RwSignal<String>| {
        view! {
            <label class="field">
                <span>{label}</span>
                <input
                    type=kind
                    prop:value=move || value.get()
                    on:input=move |ev| value.set(event_target_value(&ev))
                />
            </label>
        }
    };

    view! {
        <div class="modal-backdrop">
            <div class="modal lead-modal">
                <button class="modal-close" on:click=move |_| on_close.run(())>"✕"</button>

                {move || match step.get() {
                    Step::Form => view! {
                        <form on:submit=submit>
                            <h2>"Đăng ký tư vấn miễn phí"</h2>
                            <p class="subtitle">"Để lại thông tin, chuyên viên FastPOS sẽ liên hệ với bạn."</p>
                            {field("Họ và tên *", "text", name)}
                            {field("Email *", "email", email)}
                            {field("Số điện thoại *", "tel", phone)}
                            {field("Tên cửa hàng / Công ty", "text", company)}
                            <label class="field">
                                <span>"Ghi chú"</span>
                                <textarea
                                    prop:value=move || note.get()
                                    on:input=move |ev| note.set(event_target_value(&ev))
                                />
                            </label>
                            {move || error.get().map(|e| view! { <p class="error">{e}</p> })}
                            <button type="submit" class="btn btn-primary" disabled=move || loading.get()>
                                {move || if loading.get() { "Đang gửi..." } else { "Gửi đăng ký" }}
                            </button>
                        </form>
                    }
                    .into_any(),
                    Step::Success(confirmation) => view! {
                        <div class="lead-success">
                            <h2>"✓ Đăng ký thành công!"</h2>
                            <p>"Email xác nhận đã được gửi tới bạn:"</p>
                            <pre class="email-preview">{confirmation}</pre>
                            <button class="btn" on:click=move |_| on_close.run(())>"Đóng"</button>
                        </div>
                    }
                    .into_any(),
                }}
            </div>
        </div>
    }
}
