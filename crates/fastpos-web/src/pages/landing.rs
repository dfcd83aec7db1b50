//! Landing Page

use leptos::prelude::*;

use crate::components::{Faq, FloatingChatbot, LeadFormModal, Playground};

const MAP_EMBED: &str = "https://maps.google.com/maps?q=66%20Nguyễn%20Huệ%2C%20Quận%201%2C%20Hồ%20Chí%20Minh&t=&z=15&ie=UTF8&iwloc=&output=embed";

const HIGHLIGHTS: [&str; 4] = [
    "Quản lý bán hàng đa kênh (Omnichannel)",
    "Đồng bộ kho hàng & đơn hàng Real-time",
    "Báo cáo phân tích hành vi khách hàng",
    "Tích hợp AI dự báo xu hướng",
];

const VALUES: [(&str, &str); 3] = [
    ("Tốc độ", "Thanh toán trong vài giây, không để khách hàng chờ đợi."),
    ("Kết nối", "Một nền tảng cho cửa hàng, kho và kênh online."),
    ("Thông minh", "Dữ liệu bán hàng biến thành quyết định kinh doanh."),
];

const STEPS: [(u8, &str, &str); 3] = [
    (1, "Tư Vấn", "Khảo sát quy trình hiện tại"),
    (2, "Triển Khai", "Setup hệ thống & Đào tạo"),
    (3, "Tăng Trưởng", "Tối ưu hóa & Hỗ trợ 24/7"),
];

#[component]
pub fn LandingPage() -> impl IntoView {
    let show_lead = RwSignal::new(false);
    let lead_source = RwSignal::new(String::from("General"));
    let show_playground = RwSignal::new(false);

    // Every CTA opens the same form, tagged with where it was clicked
    let open_lead = move |source: &'static str| {
        lead_source.set(source.to_string());
        show_lead.set(true);
    };

    view! {
        <div class="landing">
            <header class="site-header">
                <a href="/" class="logo">"FastPOS"</a>
                <nav>
                    <a href="#gia-tri">"Giá trị"</a>
                    <a href="#ai">"AI"</a>
                    <a href="#faq">"FAQ"</a>
                    <a href="#lien-he">"Liên hệ"</a>
                </nav>
                <button class="btn btn-primary" on:click=move |_| open_lead("Header: Đăng ký")>"Đăng ký"</button>
            </header>

            <section class="hero" id="ky-nguyen-moi">
                <span class="pill">"Introduction to FastPOS"</span>
                <h1>"Vận Hành Tinh Gọn. Tăng Trưởng Vượt Trội."</h1>
                <p class="lead">
                    "Khách hàng không còn kiên nhẫn với sự chậm trễ. FastPOS hợp nhất quy trình bán lẻ của bạn vào một nền tảng duy nhất, nhanh hơn và thông minh hơn."
                </p>
                <ul class="highlights">
                    {HIGHLIGHTS.into_iter().map(|item| view! { <li>"✓ " {item}</li> }).collect_view()}
                </ul>
                <div class="actions">
                    <button class="btn btn-dark" on:click=move |_| open_lead("Hero: Trải nghiệm ngay")>
                        "Trải nghiệm ngay →"
                    </button>
                    <a href="#gia-tri" class="btn">"Tìm hiểu thêm"</a>
                </div>
            </section>

            <section class="values" id="gia-tri">
                <h2>"Giá Trị Cốt Lõi"</h2>
                <div class="cards">
                    {VALUES
                        .into_iter()
                        .map(|(title, text)| {
                            view! {
                                <div class="card">
                                    <h3>{title}</h3>
                                    <p>{text}</p>
                                </div>
                            }
                        })
                        .collect_view()}
                </div>
            </section>

            <section class="results">
                <h2>"Kết Quả & Lợi Ích Thực Tế"</h2>
                <p>"Chúng tôi mang lại sự tăng trưởng có thể đo lường được bằng con số."</p>
                <button class="btn btn-primary" on:click=move |_| open_lead("Stats: Xem báo cáo mẫu")>
                    "Xem Báo Cáo Mẫu →"
                </button>
            </section>

            <section class="ai" id="ai">
                <h2>"FastPOS AI"</h2>
                <p>"Trò chuyện với trợ lý, chỉnh sửa ảnh sản phẩm và tạo video quảng cáo từ một bức ảnh."</p>
                <button class="btn btn-dark" on:click=move |_| show_playground.set(true)>
                    "✨ Mở AI Playground"
                </button>
            </section>

            <Faq />

            <section class="cta" id="cta">
                <h2>"Sẵn Sàng Kiến Tạo Tương Lai?"</h2>
                <div class="steps">
                    {STEPS
                        .into_iter()
                        .map(|(n, title, text)| {
                            view! {
                                <div class="step">
                                    <span class="step-number">{n}</span>
                                    <h4>{title}</h4>
                                    <p>{text}</p>
                                </div>
                            }
                        })
                        .collect_view()}
                </div>
                <div class="actions">
                    <button class="btn btn-primary" on:click=move |_| open_lead("CTA: Lên Lịch Demo")>
                        "Lên Lịch Demo →"
                    </button>
                    <button class="btn" on:click=move |_| open_lead("CTA: Liên Hệ Tư Vấn")>
                        "Liên Hệ Tư Vấn"
                    </button>
                </div>
            </section>

            <section class="contact" id="lien-he">
                <h2>"Liên Hệ"</h2>
                <p>"66 Nguyễn Huệ, Quận 1, Hồ Chí Minh"</p>
                <iframe class="map" src=MAP_EMBED title="FastPOS Office" {..leptos::tachys::html::attribute::custom::custom_attribute("loading", "lazy")} />
            </section>

            <footer class="site-footer">
                <p>"© FastPOS"</p>
                <button class="btn" on:click=move |_| open_lead("Footer CTA Button")>"Liên hệ tư vấn"</button>
            </footer>

            <FloatingChatbot />

            <Show when=move || show_playground.get()>
                <Playground on_close=Callback::new(move |()| show_playground.set(false)) />
            </Show>

            <Show when=move || show_lead.get()>
                <LeadFormModal source=lead_source on_close=Callback::new(move |()| show_lead.set(false)) />
            </Show>
        </div>
    }
}
