//! FAQ Accordion

use leptos::prelude::*;

const FAQS: [(&str, &str); 6] = [
    (
        "FastPOS có phù hợp với mô hình kinh doanh nhỏ không?",
        "Có, FastPOS được thiết kế tối ưu cho mọi quy mô, từ cửa hàng nhỏ lẻ, quán cafe đến chuỗi bán lẻ lớn. Bạn có thể bắt đầu với gói cơ bản miễn phí hoặc gói Startup tiết kiệm và nâng cấp dễ dàng khi doanh nghiệp mở rộng.",
    ),
    (
        "Chi phí triển khai FastPOS được tính như thế nào?",
        "Chúng tôi cung cấp mô hình đăng ký (SaaS) linh hoạt theo tháng hoặc năm để giảm áp lực chi phí ban đầu. Chi phí cụ thể phụ thuộc vào số lượng chi nhánh, người dùng và các tính năng nâng cao bạn cần. Hãy liên hệ để nhận báo giá chi tiết.",
    ),
    (
        "Tôi có cần mua thiết bị phần cứng mới không?",
        "FastPOS hoạt động trên nền tảng web và ứng dụng di động, tương thích với hầu hết các thiết bị phần cứng hiện có như máy tính, máy tính bảng, máy in, máy quét mã vạch. Tuy nhiên, chúng tôi cũng cung cấp các thiết bị chuyên dụng FastHardware nếu bạn cần sự đồng bộ và hiệu suất cao nhất.",
    ),
    (
        "Dữ liệu của tôi có được bảo mật không?",
        "An toàn dữ liệu là ưu tiên hàng đầu của FastPOS. Chúng tôi sử dụng mã hóa SSL/TLS tiêu chuẩn ngân hàng, sao lưu dữ liệu tự động hàng ngày và lưu trữ trên nền tảng đám mây Google Cloud an toàn.",
    ),
    (
        "Thời gian triển khai hệ thống mất bao lâu?",
        "Với quy trình tinh gọn 'Fast & Easy', việc thiết lập hệ thống, nhập liệu sản phẩm và đào tạo nhân viên thường chỉ mất từ 3-7 ngày. Đội ngũ triển khai của chúng tôi sẽ hỗ trợ trực tiếp tại điểm bán.",
    ),
    (
        "FastPOS có hỗ trợ kỹ thuật khi gặp sự cố không?",
        "Chắc chắn rồi. Đội ngũ hỗ trợ khách hàng của chúng tôi luôn sẵn sàng 24/7 qua Hotline, Zalo, Email và Chat trực tuyến trên ứng dụng để đảm bảo hoạt động kinh doanh của bạn luôn thông suốt.",
    ),
];

/// At most one answer is open; clicking the open question collapses it
fn toggled(open: Option<usize>, index: usize) -> Option<usize> {
    if open == Some(index) {
        None
    } else {
        Some(index)
    }
}

#[component]
pub fn Faq() -> impl IntoView {
    let open = RwSignal::new(Some(0_usize));

    view! {
        <section class="faq" id="faq">
            <span class="pill">"Support Center"</span>
            <h2>"Câu Hỏi Thường Gặp"</h2>
            <p>"Giải đáp nhanh những thắc mắc phổ biến nhất về giải pháp FastPOS."</p>

            <div class="faq-items">
                {FAQS
                    .into_iter()
                    .enumerate()
                    .map(|(index, (question, answer))| {
                        let is_open = move || open.get() == Some(index);
                        view! {
                            <div class="faq-item" class:open=is_open>
                                <button
                                    class="faq-question"
                                    aria-expanded=move || is_open().to_string()
                                    aria-controls=format!("faq-answer-{index}")
                                    on:click=move |_| open.update(|o| *o = toggled(*o, index))
                                >
                                    <span>{question}</span>
                                    <span class="chevron">"⌄"</span>
                                </button>
                                <div class="faq-answer" id=format!("faq-answer-{index}") class:hidden=move || !is_open()>
                                    {answer}
                                </div>
                            </div>
                        }
                    })
                    .collect_view()}
            </div>

            <p class="faq-more">"Bạn vẫn còn thắc mắc?"</p>
            <a href="#cta" class="faq-link">"Liên hệ với đội ngũ tư vấn →"</a>
        </section>
    }
}
